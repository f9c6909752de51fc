//! The background refresh loop and its hand-off to consumers.

mod channel;
mod cycle;
mod timer;

pub use channel::{BoardReceiver, BoardSender, PublishError, board_channel};
pub use cycle::{CycleError, RefreshCycle, RefreshTask};
pub use timer::{PeriodicTask, Task, next_deadline};
