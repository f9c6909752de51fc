//! JSON response bodies.

use serde::Serialize;

use crate::domain::{ArrivalTime, Board};

/// Body of `GET /api/arrivals`.
#[derive(Debug, Serialize)]
pub struct ArrivalsResponse {
    /// Nanoseconds since the epoch at which the response was produced
    pub timestamp: i64,

    /// Local time of the refresh the data comes from
    pub generated_at: String,

    pub data: Vec<ArrivalResult>,
}

impl ArrivalsResponse {
    pub fn new(timestamp: i64, board: &Board) -> Self {
        Self {
            timestamp,
            generated_at: board.generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            data: board
                .arrivals
                .iter()
                .map(|a| ArrivalResult::new(a, board))
                .collect(),
        }
    }
}

/// One arrival in the JSON API.
#[derive(Debug, Serialize)]
pub struct ArrivalResult {
    pub stop_id: String,
    pub stop_code: String,
    pub route: String,
    pub destination: String,
    pub due_in_seconds: i64,
    pub due_in_minutes: i64,

    /// "Due", "7min" or "HH:MM"
    pub due_in: String,

    pub is_added: bool,
}

impl ArrivalResult {
    fn new(arrival: &ArrivalTime, board: &Board) -> Self {
        let due_in = if arrival.is_due() {
            "Due".to_string()
        } else {
            arrival.due_in_display(board.generated_at)
        };
        Self {
            stop_id: arrival.stop_id.to_string(),
            stop_code: arrival.stop_code.to_string(),
            route: arrival.route.clone(),
            destination: arrival.destination.clone(),
            due_in_seconds: arrival.due_in_seconds,
            due_in_minutes: arrival.due_in_minutes(),
            due_in,
            is_added: arrival.is_added,
        }
    }
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
