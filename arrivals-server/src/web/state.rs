//! Shared state for the web layer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{Board, StopCode};
use crate::refresh::BoardReceiver;

/// The most recent board, replaced whole on every refresh.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    latest: Arc<RwLock<Option<Arc<Board>>>>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first refresh has published.
    pub async fn latest(&self) -> Option<Arc<Board>> {
        self.latest.read().await.clone()
    }

    pub async fn replace(&self, board: Arc<Board>) {
        *self.latest.write().await = Some(board);
    }

    /// Drain `rx` into this state until the refresh side goes away.
    pub async fn consume(self, mut rx: BoardReceiver) {
        while let Some(board) = rx.recv().await {
            log_board(&board);
            self.replace(board).await;
        }
        debug!("board channel closed; consumer exiting");
    }
}

fn log_board(board: &Board) {
    info!(
        generated_at = %board.generated_at.format("%d/%m/%Y %H:%M"),
        arrivals = board.arrivals.len(),
        "board updated"
    );
    for arrival in &board.arrivals {
        let time_left = if arrival.is_due() {
            "Due".to_string()
        } else {
            arrival.due_in_display(board.generated_at)
        };
        info!(
            route = %arrival.route,
            destination = %arrival.destination,
            stop = %arrival.stop_code,
            added = arrival.is_added,
            "{time_left}"
        );
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub board: BoardState,

    /// Minutes to walk to each configured stop
    pub walk_times: Arc<HashMap<StopCode, i64>>,
}

impl AppState {
    pub fn new(board: BoardState, walk_times: HashMap<StopCode, i64>) -> Self {
        Self {
            board,
            walk_times: Arc::new(walk_times),
        }
    }

    pub fn walk_time(&self, stop: &StopCode) -> i64 {
        self.walk_times.get(stop).copied().unwrap_or(0)
    }
}
