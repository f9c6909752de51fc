//! Feed snapshots served from disk.
//!
//! Used when no API key is configured, and by tests. The file is re-read on
//! every fetch so it can be edited while the server runs.

use std::path::{Path, PathBuf};

use super::RealtimeSource;
use super::client::parse_feed;
use super::error::RealtimeError;
use super::types::FeedMessage;

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RealtimeSource for FileSource {
    async fn fetch(&self) -> Result<FeedMessage, RealtimeError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RealtimeError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_feed(&body)
    }
}
