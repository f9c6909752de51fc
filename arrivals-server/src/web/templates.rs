//! Askama templates for the HTML board.

use askama::Template;

use crate::domain::{ArrivalTime, Board};

use super::state::AppState;

/// Spare minutes above which there is plenty of time to walk.
const RELAXED_SPARE_MINS: i64 = 5;

/// Spare minutes above which the stop is still reachable at a walk.
const HURRY_SPARE_MINS: i64 = 1;

/// The whole board page.
#[derive(Template)]
#[template(path = "board.html")]
pub struct BoardTemplate {
    /// "dd/mm/YYYY HH:MM" of the refresh, if there has been one
    pub current_time: Option<String>,
    pub rows: Vec<ArrivalView>,
}

impl BoardTemplate {
    /// Shown before the first refresh completes.
    pub fn loading() -> Self {
        Self {
            current_time: None,
            rows: Vec::new(),
        }
    }

    pub fn from_board(board: &Board, state: &AppState) -> Self {
        let rows = board
            .arrivals
            .iter()
            .map(|a| ArrivalView::new(a, board, state.walk_time(&a.stop_code)))
            .collect();
        Self {
            current_time: Some(board.generated_at.format("%d/%m/%Y %H:%M").to_string()),
            rows,
        }
    }
}

/// How much slack there is between walking to the stop and the arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Relaxed,
    Hurry,
    TooLate,
}

impl Urgency {
    pub fn from_spare_minutes(spare: i64) -> Self {
        if spare > RELAXED_SPARE_MINS {
            Urgency::Relaxed
        } else if spare > HURRY_SPARE_MINS {
            Urgency::Hurry
        } else {
            Urgency::TooLate
        }
    }

    /// CSS class for the time column.
    pub fn css_class(self) -> &'static str {
        match self {
            Urgency::Relaxed => "lcd-green",
            Urgency::Hurry => "lcd-amber",
            Urgency::TooLate => "lcd-red",
        }
    }
}

/// One board line.
#[derive(Debug, Clone)]
pub struct ArrivalView {
    pub route: String,
    pub destination: String,
    pub time_left: String,
    pub urgency: Urgency,
    pub is_added: bool,
}

impl ArrivalView {
    pub fn new(arrival: &ArrivalTime, board: &Board, walk_mins: i64) -> Self {
        let time_left = if arrival.is_due() {
            "Due".to_string()
        } else {
            arrival.due_in_display(board.generated_at)
        };
        Self {
            route: arrival.route.clone(),
            destination: arrival.destination.clone(),
            time_left,
            urgency: Urgency::from_spare_minutes(arrival.due_in_minutes() - walk_mins),
            is_added: arrival.is_added,
        }
    }

    pub fn time_class(&self) -> &'static str {
        self.urgency.css_class()
    }

    pub fn text_class(&self) -> &'static str {
        if self.is_added { "lcd-green" } else { "lcd-amber" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StopCode, StopId};
    use crate::feed::fixture;
    use crate::web::BoardState;
    use std::collections::HashMap;

    fn arrival(due_in_seconds: i64, is_added: bool) -> ArrivalTime {
        ArrivalTime {
            stop_id: StopId::new("S"),
            stop_code: StopCode::new("100"),
            route: "46A".to_string(),
            destination: "Dun Laoghaire".to_string(),
            due_in_seconds,
            is_added,
        }
    }

    fn state(walk: i64) -> AppState {
        AppState::new(BoardState::new(), HashMap::from([(StopCode::new("100"), walk)]))
    }

    #[test]
    fn urgency_thresholds() {
        assert_eq!(Urgency::from_spare_minutes(6), Urgency::Relaxed);
        assert_eq!(Urgency::from_spare_minutes(5), Urgency::Hurry);
        assert_eq!(Urgency::from_spare_minutes(2), Urgency::Hurry);
        assert_eq!(Urgency::from_spare_minutes(1), Urgency::TooLate);
        assert_eq!(Urgency::from_spare_minutes(-3), Urgency::TooLate);
    }

    #[test]
    fn rows_account_for_walking_time() {
        let board = Board::new(
            fixture::wall(2024, 1, 8, 8, 5, 0),
            vec![arrival(30, false), arrival(600, false), arrival(7200, true)],
        );
        let page = BoardTemplate::from_board(&board, &state(4));

        let rows: Vec<_> = page
            .rows
            .iter()
            .map(|r| (r.time_left.as_str(), r.time_class(), r.text_class()))
            .collect();
        assert_eq!(
            rows,
            [
                ("Due", "lcd-red", "lcd-amber"),
                ("10min", "lcd-green", "lcd-amber"),
                ("10:05", "lcd-green", "lcd-green"),
            ]
        );
        assert_eq!(page.current_time.as_deref(), Some("08/01/2024 08:05"));
    }

    #[test]
    fn renders_rows_and_loading_page() {
        let board = Board::new(fixture::wall(2024, 1, 8, 8, 5, 0), vec![arrival(420, false)]);
        let html = BoardTemplate::from_board(&board, &state(0)).render().unwrap();
        assert!(html.contains("46A"));
        assert!(html.contains("Dun Laoghaire"));
        assert!(html.contains("7min"));
        assert!(html.contains("Current time:"));
        assert!(html.contains("2024 08:05"));

        let html = BoardTemplate::loading().render().unwrap();
        assert!(html.contains("Loading feeds..."));
    }
}
