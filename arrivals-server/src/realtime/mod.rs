//! GTFS-Realtime trip updates.
//!
//! The feed is polled once per refresh cycle. A poll either yields a whole
//! [`FeedMessage`] or fails; [`merge::parse`] turns the message into a
//! [`RealtimeSnapshot`] and [`merge::apply`] folds that into the projected
//! schedule.
//!
//! Trip and stop ids in the feed refer to the static feed the server loaded.
//! Times are either delays relative to the schedule (scheduled trips) or
//! absolute POSIX times (added trips).

mod client;
mod error;
mod file;
pub mod merge;
mod types;

use std::future::Future;

pub use client::{RealtimeClient, RealtimeClientConfig};
pub use error::{MalformedEntity, RealtimeError};
pub use file::FileSource;
pub use merge::{AddedArrival, CanceledTrips, ParseContext, RealtimeDelta, RealtimeSnapshot};
pub use types::{
    FeedEntity, FeedHeader, FeedMessage, ScheduleRelationship, StopTimeEvent, StopTimeUpdate,
    TripDescriptor, TripUpdate,
};

use crate::config::RealtimeConfig;

/// Something that can be polled for a feed message.
pub trait RealtimeSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<FeedMessage, RealtimeError>> + Send;
}

/// The configured source: the live endpoint, or a snapshot file when no API
/// key is set.
#[derive(Debug, Clone)]
pub enum AnySource {
    Http(RealtimeClient),
    File(FileSource),
}

impl AnySource {
    pub fn from_config(config: &RealtimeConfig) -> Result<Self, RealtimeError> {
        if !config.api_key.is_empty() {
            let client = RealtimeClient::new(
                RealtimeClientConfig::new(&config.url, &config.api_key)
                    .with_connect_timeout(config.connect_timeout_secs)
                    .with_timeout(config.timeout_secs),
            )?;
            return Ok(AnySource::Http(client));
        }
        match &config.example_file {
            Some(path) => Ok(AnySource::File(FileSource::new(path))),
            None => Err(RealtimeError::NotConfigured(
                "no API key and no example_file".to_string(),
            )),
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            AnySource::Http(_) => "live endpoint".to_string(),
            AnySource::File(f) => format!("snapshot file {}", f.path().display()),
        }
    }
}

impl RealtimeSource for AnySource {
    async fn fetch(&self) -> Result<FeedMessage, RealtimeError> {
        match self {
            AnySource::Http(client) => client.fetch().await,
            AnySource::File(file) => file.fetch().await,
        }
    }
}
