//! Static feed error types.

use std::path::PathBuf;

use crate::domain::{StopId, TimeError, TripId};

/// The static feed could not be obtained or read. Fatal at startup: there is
/// no schedule to serve without it.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Archive missing or unreadable
    #[error("failed to open feed archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive is not a valid zip file
    #[error("corrupt feed archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A required table is absent from the archive
    #[error("feed archive has no {member}: {source}")]
    MissingMember {
        member: &'static str,
        #[source]
        source: zip::result::ZipError,
    },

    /// A table row could not be decoded
    #[error("malformed row in {member}: {source}")]
    Csv {
        member: &'static str,
        #[source]
        source: csv::Error,
    },

    /// A stop time has an unparseable clock value
    #[error("bad time for trip {trip_id} at stop {stop_id}: {source}")]
    Time {
        trip_id: TripId,
        stop_id: StopId,
        #[source]
        source: TimeError,
    },

    /// A calendar date is not YYYYMMDD
    #[error("bad date {value:?} in {member}: {source}")]
    Date {
        member: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A calendar weekday flag is not 0 or 1
    #[error("bad weekday flag {value} for service {service_id}")]
    Weekday { service_id: String, value: u8 },

    /// Downloading the archive failed
    #[error("feed download failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed server answered with an error status
    #[error("feed download from {url} returned {status}")]
    Status { url: String, status: u16 },
}
