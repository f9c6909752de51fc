//! GTFS-Realtime JSON wire types.
//!
//! These mirror the `TripUpdates` feed as rendered to JSON by the feed
//! publisher. Fields are optional wherever publishers omit them. The
//! entity list is held as raw JSON so one bad entity does not fail the
//! whole feed; [`FeedEntity`] is decoded per entity.

use serde::{Deserialize, Deserializer};

/// Top-level feed payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMessage {
    #[serde(default)]
    pub header: Option<FeedHeader>,

    #[serde(default)]
    pub entity: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedHeader {
    #[serde(default)]
    pub gtfs_realtime_version: Option<String>,

    /// POSIX time the feed was generated.
    #[serde(default, deserialize_with = "int_or_string")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntity {
    pub id: String,

    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub trip_update: Option<TripUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripUpdate {
    pub trip: TripDescriptor,

    #[serde(default)]
    pub stop_time_update: Vec<StopTimeUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripDescriptor {
    #[serde(default)]
    pub trip_id: Option<String>,

    #[serde(default)]
    pub route_id: Option<String>,

    /// "HH:MM:SS", may exceed 24:00:00.
    #[serde(default)]
    pub start_time: Option<String>,

    /// "YYYYMMDD".
    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(default)]
    pub schedule_relationship: ScheduleRelationship,

    #[serde(default)]
    pub direction_id: Option<u8>,
}

/// How a trip relates to the static schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleRelationship {
    #[default]
    Scheduled,
    Added,
    Unscheduled,
    #[serde(alias = "CANCELLED")]
    Canceled,
    Replacement,
    Duplicated,
    Deleted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopTimeUpdate {
    #[serde(default)]
    pub stop_sequence: Option<u32>,

    #[serde(default)]
    pub stop_id: Option<String>,

    #[serde(default)]
    pub arrival: Option<StopTimeEvent>,

    #[serde(default)]
    pub departure: Option<StopTimeEvent>,
}

impl StopTimeUpdate {
    /// Arrival event, falling back to departure.
    pub fn event(&self) -> Option<&StopTimeEvent> {
        self.arrival.as_ref().or(self.departure.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopTimeEvent {
    /// Seconds late (negative when early).
    #[serde(default)]
    pub delay: Option<i32>,

    /// Absolute POSIX time.
    #[serde(default, deserialize_with = "int_or_string")]
    pub time: Option<i64>,
}

/// Some publishers render 64-bit integers as JSON strings.
fn int_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(v)) => Ok(Some(v)),
        Some(Raw::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}
