//! Arrival entries as published to the board.

use chrono::{Duration, NaiveDateTime};

use super::ids::{StopCode, StopId};

/// Below this many minutes the board shows "12min" rather than a clock time.
pub const CLOCK_DISPLAY_THRESHOLD_MINS: i64 = 60;

/// A vehicle due at one of the configured stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalTime {
    pub stop_id: StopId,

    /// Public stop code, for walking-time lookups and display.
    pub stop_code: StopCode,

    /// Route short name, e.g. "46A".
    pub route: String,

    /// Headsign text.
    pub destination: String,

    /// Seconds from the cycle's "now" until arrival.
    pub due_in_seconds: i64,

    /// True for trips that only exist in the realtime feed.
    pub is_added: bool,
}

impl ArrivalTime {
    /// Whole minutes until arrival, truncated towards zero.
    pub fn due_in_minutes(&self) -> i64 {
        self.due_in_seconds / 60
    }

    pub fn is_due(&self) -> bool {
        self.due_in_minutes() < 1
    }

    /// Human display: "7min" for near arrivals, otherwise the clock time
    /// of arrival as "HH:MM".
    pub fn due_in_display(&self, now: NaiveDateTime) -> String {
        if self.due_in_minutes() < CLOCK_DISPLAY_THRESHOLD_MINS {
            format!("{}min", self.due_in_minutes())
        } else {
            let at = now + Duration::seconds(self.due_in_seconds);
            at.format("%H:%M").to_string()
        }
    }
}

/// Sort by due time. The sort is stable so equal due times keep their
/// relative order.
pub fn sort_by_due(arrivals: &mut [ArrivalTime]) {
    arrivals.sort_by_key(|a| a.due_in_seconds);
}

/// One published refresh result.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Local wall-clock time of the refresh that produced this board.
    pub generated_at: NaiveDateTime,
    pub arrivals: Vec<ArrivalTime>,
}

impl Board {
    pub fn new(generated_at: NaiveDateTime, arrivals: Vec<ArrivalTime>) -> Self {
        Self {
            generated_at,
            arrivals,
        }
    }
}
