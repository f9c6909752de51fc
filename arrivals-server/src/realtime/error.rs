//! Realtime feed error types.

use std::fmt;
use std::path::PathBuf;

/// A poll of the realtime feed failed. Always recoverable: the refresh
/// cycle keeps the previous snapshot and tries again next time.
#[derive(Debug)]
pub enum RealtimeError {
    /// Network failure, timeout or similar
    Http(reqwest::Error),

    /// Non-success status code
    Status { status: u16, message: String },

    /// API key rejected
    Unauthorized,

    /// Too many requests
    RateLimited,

    /// Payload is not a feed message
    Json {
        message: String,
        body: Option<String>,
    },

    /// Feed snapshot file could not be read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The client could not be set up
    NotConfigured(String),
}

impl fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealtimeError::Http(e) => write!(f, "HTTP error: {e}"),
            RealtimeError::Status { status, message } => {
                write!(f, "realtime feed returned {status}: {message}")
            }
            RealtimeError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
            RealtimeError::RateLimited => write!(f, "rate limited by realtime feed"),
            RealtimeError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            RealtimeError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            RealtimeError::NotConfigured(msg) => write!(f, "not configured: {msg}"),
        }
    }
}

impl std::error::Error for RealtimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RealtimeError::Http(e) => Some(e),
            RealtimeError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RealtimeError {
    fn from(err: reqwest::Error) -> Self {
        RealtimeError::Http(err)
    }
}

/// One feed entity could not be decoded. The entity is skipped.
#[derive(Debug, thiserror::Error)]
#[error("malformed entity {entity_id}: {message}")]
pub struct MalformedEntity {
    pub entity_id: String,
    pub message: String,
}
