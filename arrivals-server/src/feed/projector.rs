//! Upcoming scheduled visits at the configured stops.

use std::collections::HashSet;

use crate::domain::{ServiceTime, StopId, TripId};

use super::calendar::ServiceDays;
use super::index::ScheduleIndex;

/// One scheduled visit, with `scheduled` on today's service-day scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedVisit {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub scheduled: ServiceTime,
}

pub struct ArrivalProjector<'a> {
    index: &'a ScheduleIndex,
}

impl<'a> ArrivalProjector<'a> {
    pub fn new(index: &'a ScheduleIndex) -> Self {
        Self { index }
    }

    /// The first `count` visits strictly after `now` in ascending order.
    ///
    /// Visits on yesterday's service day are shifted back a day, so
    /// `25:10:00` yesterday becomes `01:10:00` today and anything that ends
    /// up before midnight today is already in the past.
    pub fn project(
        &self,
        days: &ServiceDays,
        stop_ids: &HashSet<StopId>,
        now: ServiceTime,
        count: usize,
    ) -> Vec<ProjectedVisit> {
        let now = i64::from(now.seconds());
        let mut visits = Vec::new();

        for day in days.iter() {
            if day.services.is_empty() {
                continue;
            }
            let offset = day.offset_seconds();
            for st in self.index.stop_times() {
                if !stop_ids.contains(&st.stop_id) {
                    continue;
                }
                let Some(trip) = self.index.trip(&st.trip_id) else {
                    continue;
                };
                if !day.services.contains(&trip.service_id) {
                    continue;
                }
                let on_today = i64::from(st.arrival.seconds()) + offset;
                if on_today <= now {
                    continue;
                }
                // on_today > now >= 0, so the conversion cannot fail
                let Ok(scheduled) = u32::try_from(on_today) else {
                    continue;
                };
                visits.push(ProjectedVisit {
                    trip_id: st.trip_id.clone(),
                    stop_id: st.stop_id.clone(),
                    scheduled: ServiceTime::from_seconds(scheduled),
                });
            }
        }

        visits.sort_by_key(|v| v.scheduled);
        visits.truncate(count);
        visits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Now, RouteId, ServiceId, StopCode};
    use crate::feed::ServiceCalendarResolver;
    use crate::feed::tables::{Calendar, DaysOfWeek, FeedTables, Route, Stop, StopTime, Trip};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn index(visits: &[(&str, &str, u32)]) -> ScheduleIndex {
        let mut tables = FeedTables {
            stops: vec![
                Stop {
                    stop_id: StopId::new("A"),
                    stop_code: StopCode::new("1"),
                    name: "A".into(),
                },
                Stop {
                    stop_id: StopId::new("B"),
                    stop_code: StopCode::new("2"),
                    name: "B".into(),
                },
            ],
            routes: vec![Route {
                route_id: RouteId::new("R"),
                short_name: "15A".into(),
                long_name: "Limekiln - Ringsend".into(),
            }],
            calendars: vec![Calendar {
                service_id: ServiceId::new("WK"),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                days: DaysOfWeek {
                    monday: true,
                    tuesday: true,
                    wednesday: true,
                    thursday: true,
                    friday: true,
                    ..DaysOfWeek::default()
                },
            }],
            ..FeedTables::default()
        };
        for (trip, stop, secs) in visits {
            if !tables.trips.iter().any(|t| t.trip_id.as_str() == *trip) {
                tables.trips.push(Trip {
                    trip_id: TripId::new(*trip),
                    route_id: RouteId::new("R"),
                    service_id: ServiceId::new("WK"),
                    headsign: "Ringsend".into(),
                    direction_id: Some(0),
                });
            }
            tables.stop_times.push(StopTime {
                trip_id: TripId::new(*trip),
                stop_id: StopId::new(*stop),
                arrival: ServiceTime::from_seconds(*secs),
            });
        }
        ScheduleIndex::build(tables, &[StopCode::new("1"), StopCode::new("2")]).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Now {
        let wall = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap();
        Now::new(wall, wall.and_utc().timestamp())
    }

    fn project(index: &ScheduleIndex, now: Now, count: usize) -> Vec<(String, u32)> {
        let days = ServiceCalendarResolver::new(index.calendars()).service_days(&now);
        ArrivalProjector::new(index)
            .project(&days, &index.stop_ids(), now.time_of_day(), count)
            .into_iter()
            .map(|v| (v.trip_id.to_string(), v.scheduled.seconds()))
            .collect()
    }

    #[test]
    fn strictly_future_sorted_and_truncated() {
        let index = index(&[
            ("T3", "A", 9 * 3600),
            ("T1", "A", 8 * 3600 + 600),
            ("T0", "B", 8 * 3600 + 300),
            ("T2", "B", 8 * 3600 + 1200),
        ]);
        // Monday 08:05: T0 is exactly now and is excluded
        let got = project(&index, at(2024, 1, 8, 8, 5), 2);
        assert_eq!(
            got,
            [("T1".to_string(), 29_400), ("T2".to_string(), 30_000)]
        );
    }

    #[test]
    fn post_midnight_visit_from_yesterday() {
        // 25:10:00 on Monday's service day is 01:10 on Tuesday
        let index = index(&[("NIGHT", "A", 25 * 3600 + 600), ("DAY", "A", 23 * 3600)]);
        let got = project(&index, at(2024, 1, 9, 0, 30), 10);
        // Tuesday's own runs are both ahead, Monday's 23:00 run is past
        assert_eq!(
            got,
            [
                ("NIGHT".to_string(), 3600 + 600),
                ("DAY".to_string(), 23 * 3600),
                ("NIGHT".to_string(), 25 * 3600 + 600),
            ]
        );
    }

    #[test]
    fn no_active_service_projects_nothing() {
        let index = index(&[("T1", "A", 9 * 3600)]);
        // 2024-01-13 is a Saturday, Friday's service has nothing after midnight
        assert!(project(&index, at(2024, 1, 13, 8, 0), 5).is_empty());
    }

    proptest! {
        #[test]
        fn output_is_sorted_future_and_bounded(
            times in prop::collection::vec(0u32..100_000, 1..40),
            now_mins in 0u32..1440,
            count in 0usize..20,
        ) {
            let visits: Vec<(String, &str, u32)> = times
                .iter()
                .enumerate()
                .map(|(i, t)| (format!("T{i}"), if i % 2 == 0 { "A" } else { "B" }, *t))
                .collect();
            let borrowed: Vec<(&str, &str, u32)> =
                visits.iter().map(|(t, s, x)| (t.as_str(), *s, *x)).collect();
            let index = index(&borrowed);
            let now = at(2024, 1, 10, now_mins / 60, now_mins % 60);

            let got = project(&index, now, count);
            prop_assert!(got.len() <= count);
            prop_assert!(got.windows(2).all(|w| w[0].1 <= w[1].1));
            prop_assert!(got.iter().all(|(_, t)| *t > now_mins * 60));
        }
    }
}
