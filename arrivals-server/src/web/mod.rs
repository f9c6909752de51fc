//! Web layer for the arrivals board.
//!
//! Serves the latest published board as an HTML page and as JSON.

mod dto;
mod routes;
mod state;
pub mod templates;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, BoardState};
