//! Service-day time handling.
//!
//! GTFS stop times are clock strings relative to the midnight of the service
//! day they belong to. Trips that start before midnight and run past it use
//! values of 24:00:00 and above (e.g. "25:30:00" is 01:30 the next morning),
//! so these are not `NaiveTime`s: they are a plain count of seconds.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Error returned when parsing an invalid service time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid service time {input:?}: {reason}")]
pub struct TimeError {
    input: String,
    reason: &'static str,
}

impl TimeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A time of day on a service day's scale, in seconds past its midnight.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::ServiceTime;
///
/// let t = ServiceTime::parse("25:30:00").unwrap();
/// assert_eq!(t.seconds(), 25 * 3600 + 30 * 60);
/// assert_eq!(t.to_string(), "25:30:00");
///
/// // Single-digit hours appear in some feeds
/// assert_eq!(ServiceTime::parse("8:05:00").unwrap().to_string(), "08:05:00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceTime(u32);

impl ServiceTime {
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(hours * 3600 + minutes * 60 + seconds)
    }

    /// Parse `H:MM:SS` or `HH:MM:SS`. Hours may exceed 23.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.trim().split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new(s, "expected HH:MM:SS"));
        };

        if h.is_empty() || h.len() > 2 || !h.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeError::new(s, "invalid hour digits"));
        }
        let hours: u32 = h
            .parse()
            .map_err(|_| TimeError::new(s, "invalid hour digits"))?;

        let minutes =
            parse_two_digits(m.as_bytes()).ok_or_else(|| TimeError::new(s, "invalid minute digits"))?;
        if minutes > 59 {
            return Err(TimeError::new(s, "minute must be 0-59"));
        }

        let seconds = parse_two_digits(sec.as_bytes())
            .ok_or_else(|| TimeError::new(s, "invalid second digits"))?;
        if seconds > 59 {
            return Err(TimeError::new(s, "second must be 0-59"));
        }

        Ok(Self::from_hms(hours, minutes, seconds))
    }

    /// Seconds past the service day's midnight.
    pub fn seconds(self) -> u32 {
        self.0
    }

    /// The time of day of a wall-clock instant, on that day's scale.
    pub fn of_day(at: NaiveDateTime) -> Self {
        Self(at.time().num_seconds_from_midnight())
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

/// The instant a refresh cycle is computed for.
///
/// Scheduled times are compared against the local wall clock, while
/// realtime feeds carry absolute POSIX times. Taking both from a single
/// snapshot keeps every due-in value in one cycle consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now {
    wall: NaiveDateTime,
    epoch_secs: i64,
}

impl Now {
    pub fn new(wall: NaiveDateTime, epoch_secs: i64) -> Self {
        Self { wall, epoch_secs }
    }

    pub fn from_local(at: DateTime<Local>) -> Self {
        Self {
            wall: at.naive_local(),
            epoch_secs: at.timestamp(),
        }
    }

    pub fn local() -> Self {
        Self::from_local(Local::now())
    }

    pub fn wall(&self) -> NaiveDateTime {
        self.wall
    }

    pub fn date(&self) -> NaiveDate {
        self.wall.date()
    }

    pub fn time_of_day(&self) -> ServiceTime {
        ServiceTime::of_day(self.wall)
    }

    pub fn epoch_secs(&self) -> i64 {
        self.epoch_secs
    }
}
