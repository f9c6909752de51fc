//! Streaming static feed loader.
//!
//! A full GTFS feed for a city is far larger than the handful of stops a
//! board needs, and the host may be a small single-board computer. Tables
//! are decoded straight out of the zip archive one record at a time and
//! rows that cannot matter for the configured stops are dropped as they are
//! read, so the unfiltered `stop_times.txt` is never held in memory.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::domain::{RouteId, ServiceId, ServiceTime, StopCode, StopId, TripId};

use super::error::FeedError;
use super::tables::{Calendar, DaysOfWeek, FeedTables, Route, Stop, StopTime, Trip};

const STOPS: &str = "stops.txt";
const STOP_TIMES: &str = "stop_times.txt";
const TRIPS: &str = "trips.txt";
const ROUTES: &str = "routes.txt";
const CALENDAR: &str = "calendar.txt";

/// Load the tables needed for `stop_codes` from the archive at `path`.
///
/// Blocking; call from `spawn_blocking` inside the runtime.
pub fn load_tables(path: &Path, stop_codes: &[StopCode]) -> Result<FeedTables, FeedError> {
    info!(path = %path.display(), "loading static feed");

    let file = File::open(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|source| FeedError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    load_from_archive(&mut archive, stop_codes)
}

/// Load from an already opened archive.
pub fn load_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    stop_codes: &[StopCode],
) -> Result<FeedTables, FeedError> {
    let wanted_codes: HashSet<&StopCode> = stop_codes.iter().collect();

    let mut stops = Vec::new();
    for_each_record(archive, STOPS, |rec: StopRecord| {
        match rec.stop_code {
            Some(code) if wanted_codes.contains(&code) => stops.push(Stop {
                stop_id: rec.stop_id,
                stop_code: code,
                name: rec.stop_name.unwrap_or_default(),
            }),
            _ => {}
        }
        Ok(())
    })?;
    let stop_ids: HashSet<StopId> = stops.iter().map(|s| s.stop_id.clone()).collect();
    debug!(stops = stops.len(), "matched configured stop codes");

    let mut stop_times = Vec::new();
    let mut scanned = 0usize;
    let mut untimed = 0usize;
    for_each_record(archive, STOP_TIMES, |rec: StopTimeRecord| {
        scanned += 1;
        if !stop_ids.contains(&rec.stop_id) {
            return Ok(());
        }
        // Non-timepoint rows leave both times blank
        let Some(raw) = rec.arrival_time.or(rec.departure_time) else {
            untimed += 1;
            return Ok(());
        };
        let arrival = ServiceTime::parse(&raw).map_err(|source| FeedError::Time {
            trip_id: rec.trip_id.clone(),
            stop_id: rec.stop_id.clone(),
            source,
        })?;
        stop_times.push(StopTime {
            trip_id: rec.trip_id,
            stop_id: rec.stop_id,
            arrival,
        });
        Ok(())
    })?;
    if untimed > 0 {
        debug!(untimed, "skipped stop times without a clock value");
    }
    let trip_ids: HashSet<&TripId> = stop_times.iter().map(|st| &st.trip_id).collect();

    let mut trips = Vec::new();
    for_each_record(archive, TRIPS, |rec: TripRecord| {
        if trip_ids.contains(&rec.trip_id) {
            trips.push(Trip {
                trip_id: rec.trip_id,
                route_id: rec.route_id,
                service_id: rec.service_id,
                headsign: rec.trip_headsign.unwrap_or_default(),
                direction_id: rec.direction_id,
            });
        }
        Ok(())
    })?;
    let route_ids: HashSet<&RouteId> = trips.iter().map(|t| &t.route_id).collect();
    let service_ids: HashSet<&ServiceId> = trips.iter().map(|t| &t.service_id).collect();

    let mut routes = Vec::new();
    for_each_record(archive, ROUTES, |rec: RouteRecord| {
        if route_ids.contains(&rec.route_id) {
            routes.push(Route {
                route_id: rec.route_id,
                short_name: rec.route_short_name.unwrap_or_default(),
                long_name: rec.route_long_name.unwrap_or_default(),
            });
        }
        Ok(())
    })?;

    let mut calendars = Vec::new();
    let calendar_result = for_each_record(archive, CALENDAR, |rec: CalendarRecord| {
        if service_ids.contains(&rec.service_id) {
            calendars.push(rec.into_calendar()?);
        }
        Ok(())
    });
    match calendar_result {
        Ok(()) => {}
        // Feeds driven purely by calendar_dates.txt have no calendar.txt
        Err(FeedError::MissingMember { .. }) => {
            warn!("feed has no {CALENDAR}; no service will be active");
        }
        Err(e) => return Err(e),
    }

    info!(
        stop_times_scanned = scanned,
        stops = stops.len(),
        stop_times = stop_times.len(),
        trips = trips.len(),
        routes = routes.len(),
        calendars = calendars.len(),
        "static feed loaded"
    );

    Ok(FeedTables {
        stops,
        routes,
        trips,
        stop_times,
        calendars,
    })
}

/// Decode every row of `member`, handing each to `f`.
fn for_each_record<R, T, F>(
    archive: &mut ZipArchive<R>,
    member: &'static str,
    mut f: F,
) -> Result<(), FeedError>
where
    R: Read + Seek,
    T: DeserializeOwned,
    F: FnMut(T) -> Result<(), FeedError>,
{
    let file = archive
        .by_name(member)
        .map_err(|source| FeedError::MissingMember { member, source })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    for rec in reader.deserialize() {
        let rec: T = rec.map_err(|source| FeedError::Csv { member, source })?;
        f(rec)?;
    }
    Ok(())
}

#[derive(Deserialize)]
struct StopRecord {
    stop_id: StopId,
    #[serde(default)]
    stop_code: Option<StopCode>,
    #[serde(default)]
    stop_name: Option<String>,
}

#[derive(Deserialize)]
struct StopTimeRecord {
    trip_id: TripId,
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    departure_time: Option<String>,
    stop_id: StopId,
}

#[derive(Deserialize)]
struct TripRecord {
    route_id: RouteId,
    service_id: ServiceId,
    trip_id: TripId,
    #[serde(default)]
    trip_headsign: Option<String>,
    #[serde(default)]
    direction_id: Option<u8>,
}

#[derive(Deserialize)]
struct RouteRecord {
    route_id: RouteId,
    #[serde(default)]
    route_short_name: Option<String>,
    #[serde(default)]
    route_long_name: Option<String>,
}

#[derive(Deserialize)]
struct CalendarRecord {
    service_id: ServiceId,
    monday: u8,
    tuesday: u8,
    wednesday: u8,
    thursday: u8,
    friday: u8,
    saturday: u8,
    sunday: u8,
    start_date: String,
    end_date: String,
}

impl CalendarRecord {
    fn into_calendar(self) -> Result<Calendar, FeedError> {
        let flag = |value: u8| match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(FeedError::Weekday {
                service_id: self.service_id.to_string(),
                value,
            }),
        };

        let days = DaysOfWeek {
            monday: flag(self.monday)?,
            tuesday: flag(self.tuesday)?,
            wednesday: flag(self.wednesday)?,
            thursday: flag(self.thursday)?,
            friday: flag(self.friday)?,
            saturday: flag(self.saturday)?,
            sunday: flag(self.sunday)?,
        };

        Ok(Calendar {
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
            service_id: self.service_id,
            days,
        })
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, FeedError> {
    NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|source| FeedError::Date {
        member: CALENDAR,
        value: value.to_string(),
        source,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<StopCode> {
        list.iter().map(|c| StopCode::new(*c)).collect()
    }

    #[test]
    fn keeps_only_rows_for_configured_stops() {
        let archive = test_archive::full();
        let tables = load_tables(archive.path(), &codes(&["334", "1114"])).unwrap();

        let stop_ids: Vec<_> = tables.stops.iter().map(|s| s.stop_id.as_str()).collect();
        assert_eq!(stop_ids, ["8220DB000334", "8220DB000335", "8220DB001114"]);

        // T1 at 9999 and T9 are dropped, T3 has no time
        let visits: Vec<_> = tables
            .stop_times
            .iter()
            .map(|st| (st.trip_id.as_str(), st.arrival.to_string()))
            .collect();
        assert_eq!(
            visits,
            [
                ("T1", "08:10:00".to_string()),
                ("T2", "08:20:00".to_string()),
                ("T4", "25:05:00".to_string()),
            ]
        );

        let trip_ids: Vec<_> = tables.trips.iter().map(|t| t.trip_id.as_str()).collect();
        assert_eq!(trip_ids, ["T1", "T2", "T4"]);
        assert_eq!(tables.trips[2].direction_id, None);

        let route_ids: Vec<_> = tables.routes.iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(route_ids, ["R15A", "R46A"]);

        let service_ids: Vec<_> = tables
            .calendars
            .iter()
            .map(|c| c.service_id.as_str())
            .collect();
        assert_eq!(service_ids, ["WK", "SAT"]);
        assert!(tables.calendars[0].days.monday);
        assert!(!tables.calendars[0].days.saturday);
    }

    #[test]
    fn unknown_codes_load_nothing() {
        let archive = test_archive::full();
        let tables = load_tables(archive.path(), &codes(&["0000"])).unwrap();
        assert!(tables.stops.is_empty());
        assert!(tables.stop_times.is_empty());
        assert!(tables.trips.is_empty());
    }

    #[test]
    fn missing_archive_is_io_error() {
        let err = load_tables(Path::new("/nonexistent/feed.zip"), &codes(&["334"])).unwrap_err();
        assert!(matches!(err, FeedError::Io { .. }));
    }

    #[test]
    fn corrupt_archive_is_zip_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"definitely not a zip").unwrap();
        let err = load_tables(file.path(), &codes(&["334"])).unwrap_err();
        assert!(matches!(err, FeedError::Zip { .. }));
    }

    #[test]
    fn missing_member_reported() {
        let archive = test_archive::write(&[("stops.txt", test_archive::STOPS)]);
        let err = load_tables(archive.path(), &codes(&["334"])).unwrap_err();
        assert!(matches!(
            err,
            FeedError::MissingMember {
                member: "stop_times.txt",
                ..
            }
        ));
    }

    #[test]
    fn missing_calendar_is_tolerated() {
        let archive = test_archive::write(&[
            ("stops.txt", test_archive::STOPS),
            ("stop_times.txt", test_archive::STOP_TIMES),
            ("trips.txt", test_archive::TRIPS),
            ("routes.txt", test_archive::ROUTES),
        ]);
        let tables = load_tables(archive.path(), &codes(&["334"])).unwrap();
        assert!(tables.calendars.is_empty());
        assert!(!tables.trips.is_empty());
    }

    #[test]
    fn bad_stop_time_is_fatal() {
        let archive = test_archive::write(&[
            ("stops.txt", test_archive::STOPS),
            (
                "stop_times.txt",
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence\nT1,8h10,8h10,8220DB000334,1\n",
            ),
        ]);
        let err = load_tables(archive.path(), &codes(&["334"])).unwrap_err();
        assert!(matches!(err, FeedError::Time { .. }));
    }

    #[test]
    fn bad_weekday_flag_is_fatal() {
        let archive = test_archive::write(&[
            ("stops.txt", test_archive::STOPS),
            ("stop_times.txt", test_archive::STOP_TIMES),
            ("trips.txt", test_archive::TRIPS),
            ("routes.txt", test_archive::ROUTES),
            (
                "calendar.txt",
                "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
                 WK,2,1,1,1,1,0,0,20240101,20241231\n",
            ),
        ]);
        let err = load_tables(archive.path(), &codes(&["334"])).unwrap_err();
        assert!(matches!(err, FeedError::Weekday { value: 2, .. }));
    }
}
