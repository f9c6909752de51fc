//! A small in-memory schedule shared by unit tests.
//!
//! Stops `S` (code 100) and `S2` (code 200). Weekday trips `T1` (15A,
//! 08:10 at S), `T2` (46A, 08:20 at S) and `T3` (15A, 08:30 at S2);
//! Saturday-only `T4` (SAT, 08:15 at S). Route `R77` has no trips.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{Now, RouteId, ServiceId, ServiceTime, StopCode, StopId, TripId};

use super::index::ScheduleIndex;
use super::tables::{Calendar, DaysOfWeek, FeedTables, Route, Stop, StopTime, Trip};

pub fn tables() -> FeedTables {
    let stop = |id: &str, code: &str| Stop {
        stop_id: StopId::new(id),
        stop_code: StopCode::new(code),
        name: format!("Stop {id}"),
    };
    let route = |id: &str, short: &str, long: &str| Route {
        route_id: RouteId::new(id),
        short_name: short.to_string(),
        long_name: long.to_string(),
    };
    let trip = |id: &str, route: &str, service: &str, headsign: &str, dir: u8| Trip {
        trip_id: TripId::new(id),
        route_id: RouteId::new(route),
        service_id: ServiceId::new(service),
        headsign: headsign.to_string(),
        direction_id: Some(dir),
    };
    let visit = |trip: &str, stop: &str, hms: &str| StopTime {
        trip_id: TripId::new(trip),
        stop_id: StopId::new(stop),
        arrival: ServiceTime::parse(hms).unwrap(),
    };
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

    FeedTables {
        stops: vec![stop("S", "100"), stop("S2", "200")],
        routes: vec![
            route("R15A", "15A", "Limekiln Ave - Ringsend"),
            route("R46A", "46A", "Phoenix Park - Dun Laoghaire"),
            route("RSAT", "SAT", "Saturday Special"),
            route("R77", "77A", "Tallaght - Ringsend"),
        ],
        trips: vec![
            trip("T1", "R15A", "WK", "Ringsend", 0),
            trip("T2", "R46A", "WK", "Dun Laoghaire", 1),
            trip("T3", "R15A", "WK", "Ringsend", 0),
            trip("T4", "RSAT", "SAT", "Seaside", 0),
        ],
        stop_times: vec![
            visit("T1", "S", "08:10:00"),
            visit("T2", "S", "08:20:00"),
            visit("T3", "S2", "08:30:00"),
            visit("T4", "S", "08:15:00"),
        ],
        calendars: vec![
            Calendar {
                service_id: ServiceId::new("WK"),
                start_date: start,
                end_date: end,
                days: DaysOfWeek {
                    monday: true,
                    tuesday: true,
                    wednesday: true,
                    thursday: true,
                    friday: true,
                    ..DaysOfWeek::default()
                },
            },
            Calendar {
                service_id: ServiceId::new("SAT"),
                start_date: start,
                end_date: end,
                days: DaysOfWeek {
                    saturday: true,
                    ..DaysOfWeek::default()
                },
            },
        ],
    }
}

pub fn index() -> ScheduleIndex {
    ScheduleIndex::build(tables(), &[StopCode::new("100"), StopCode::new("200")]).unwrap()
}

/// Local wall time on a given day; epoch seconds treat it as UTC.
pub fn wall(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

pub fn now(wall: NaiveDateTime) -> Now {
    Now::new(wall, wall.and_utc().timestamp())
}

/// Monday 2024-01-08 08:05:00.
pub fn monday_morning() -> Now {
    now(wall(2024, 1, 8, 8, 5, 0))
}
