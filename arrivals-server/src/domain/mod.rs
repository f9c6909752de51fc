//! Domain types for the arrivals board.
//!
//! Identifiers, service-day times and the published arrival entries. Types
//! enforce their invariants at construction time, so code that receives them
//! can trust their validity.

mod arrival;
mod ids;
mod time;

pub use arrival::{ArrivalTime, Board, CLOCK_DISPLAY_THRESHOLD_MINS, sort_by_due};
pub use ids::{RouteId, ServiceId, StopCode, StopId, TripId};
pub use time::{Now, SECONDS_PER_DAY, ServiceTime, TimeError};
