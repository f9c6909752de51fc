//! Board hand-off from the refresh task to its consumer.
//!
//! Publishing never waits. The consumer sees at most `capacity` unread
//! boards: when it falls behind further, the oldest pending boards are
//! dropped.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::Board;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("no consumer is listening for boards")]
    NoConsumer,
}

#[derive(Debug, Clone)]
pub struct BoardSender {
    tx: broadcast::Sender<Arc<Board>>,
}

#[derive(Debug)]
pub struct BoardReceiver {
    rx: broadcast::Receiver<Arc<Board>>,
    capacity: usize,
}

/// A hand-off channel keeping at most `capacity` unread boards.
pub fn board_channel(capacity: usize) -> (BoardSender, BoardReceiver) {
    let capacity = capacity.max(1);
    // broadcast rounds its buffer up to a power of two; the receiver trims
    // back down to `capacity`
    let (tx, rx) = broadcast::channel(capacity);
    (BoardSender { tx }, BoardReceiver { rx, capacity })
}

impl BoardSender {
    pub fn publish(&self, board: Board) -> Result<(), PublishError> {
        self.tx
            .send(Arc::new(board))
            .map(|_| ())
            .map_err(|_| PublishError::NoConsumer)
    }
}

impl BoardReceiver {
    /// Wait for the next board. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Arc<Board>> {
        loop {
            match self.rx.recv().await {
                Ok(_) if self.over_capacity() => dropped(1),
                Ok(board) => return Some(board),
                Err(broadcast::error::RecvError::Lagged(n)) => dropped(n),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The next board if one is waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Board>> {
        loop {
            match self.rx.try_recv() {
                Ok(_) if self.over_capacity() => dropped(1),
                Ok(board) => return Some(board),
                Err(broadcast::error::TryRecvError::Lagged(n)) => dropped(n),
                Err(_) => return None,
            }
        }
    }

    /// Whether the board just taken was older than the newest `capacity`.
    fn over_capacity(&self) -> bool {
        self.rx.len() >= self.capacity
    }
}

fn dropped(count: u64) {
    debug!(dropped = count, "consumer fell behind; oldest boards dropped");
}
