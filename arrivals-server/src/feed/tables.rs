//! Normalized static feed rows.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::{RouteId, ServiceId, ServiceTime, StopCode, StopId, TripId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    pub stop_id: StopId,
    pub stop_code: StopCode,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub route_id: RouteId,
    /// Line number shown on the board, e.g. "46A".
    pub short_name: String,
    pub long_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub service_id: ServiceId,
    pub headsign: String,
    pub direction_id: Option<u8>,
}

/// Scheduled arrival of one trip at one stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub arrival: ServiceTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaysOfWeek {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl DaysOfWeek {
    pub fn all() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
        }
    }

    pub fn includes(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

/// A `calendar.txt` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub service_id: ServiceId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: DaysOfWeek,
}

impl Calendar {
    /// Whether the service runs on `date`: inside the inclusive date range
    /// and flagged for that weekday.
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date && self.days.includes(date.weekday())
    }
}

/// The tables a static feed load produces, already narrowed to rows that
/// can matter for the configured stops.
#[derive(Debug, Clone, Default)]
pub struct FeedTables {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub stop_times: Vec<StopTime>,
    pub calendars: Vec<Calendar>,
}
