//! Turning a realtime feed into delays, cancellations and added trips, and
//! applying those to the projected schedule.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{
    ArrivalTime, Now, RouteId, SECONDS_PER_DAY, ServiceTime, StopCode, StopId, TripId,
    sort_by_due,
};
use crate::feed::{ProjectedVisit, ScheduleIndex, ServiceDays};

use super::error::MalformedEntity;
use super::types::{FeedEntity, FeedMessage, ScheduleRelationship, TripDescriptor, TripUpdate};

/// Delay in seconds per (trip, stop).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealtimeDelta(HashMap<TripId, HashMap<StopId, i32>>);

impl RealtimeDelta {
    pub fn record(&mut self, trip: TripId, stop: StopId, delay: i32) {
        self.0.entry(trip).or_default().insert(stop, delay);
    }

    /// Recorded delay, 0 when none.
    pub fn delay_for(&self, trip: &TripId, stop: &StopId) -> i32 {
        self.0
            .get(trip)
            .and_then(|stops| stops.get(stop))
            .copied()
            .unwrap_or(0)
    }

    /// Number of trips with at least one delay.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub type CanceledTrips = HashSet<TripId>;

/// A visit by a trip that only exists in the realtime feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedArrival {
    pub stop_id: StopId,
    pub stop_code: StopCode,
    pub route: String,
    pub destination: String,
    /// Absolute POSIX arrival time.
    pub arrival_epoch_secs: i64,
}

impl AddedArrival {
    pub fn due_in_seconds(&self, now: &Now) -> i64 {
        self.arrival_epoch_secs - now.epoch_secs()
    }

    fn to_arrival(&self, now: &Now) -> ArrivalTime {
        ArrivalTime {
            stop_id: self.stop_id.clone(),
            stop_code: self.stop_code.clone(),
            route: self.route.clone(),
            destination: self.destination.clone(),
            due_in_seconds: self.due_in_seconds(now),
            is_added: true,
        }
    }
}

/// Everything one successful poll tells us. Replaced as a whole on the
/// next successful poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealtimeSnapshot {
    pub delta: RealtimeDelta,
    pub canceled: CanceledTrips,
    pub added: Vec<AddedArrival>,
    /// Entities that could not be decoded.
    pub skipped: usize,
}

/// What parsing needs to know about the schedule and the clock.
pub struct ParseContext<'a> {
    index: &'a ScheduleIndex,
    /// Routes with a trip on a service running today.
    relevant_routes: HashSet<RouteId>,
    now: Now,
}

impl<'a> ParseContext<'a> {
    pub fn new(index: &'a ScheduleIndex, days: &ServiceDays, now: Now) -> Self {
        Self {
            index,
            relevant_routes: index.routes_for_services(&days.today()),
            now,
        }
    }
}

/// Decode every entity of `feed`. Malformed entities are logged and
/// skipped; the rest of the feed is still used.
pub fn parse(feed: &FeedMessage, ctx: &ParseContext<'_>) -> RealtimeSnapshot {
    let mut snapshot = RealtimeSnapshot::default();

    for raw in &feed.entity {
        let result = decode_entity(raw).and_then(|entity| apply_entity(entity, ctx, &mut snapshot));
        if let Err(e) = result {
            warn!(error = %e, entity = %raw, "skipping realtime entity");
            snapshot.skipped += 1;
        }
    }

    debug!(
        delayed_trips = snapshot.delta.len(),
        canceled = snapshot.canceled.len(),
        added = snapshot.added.len(),
        skipped = snapshot.skipped,
        "realtime feed parsed"
    );
    snapshot
}

fn decode_entity(raw: &serde_json::Value) -> Result<FeedEntity, MalformedEntity> {
    FeedEntity::deserialize(raw).map_err(|e| MalformedEntity {
        entity_id: raw
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("?")
            .to_string(),
        message: e.to_string(),
    })
}

fn apply_entity(
    entity: FeedEntity,
    ctx: &ParseContext<'_>,
    snapshot: &mut RealtimeSnapshot,
) -> Result<(), MalformedEntity> {
    if entity.is_deleted {
        return Ok(());
    }
    // Vehicle positions and alerts share the feed format
    let Some(update) = entity.trip_update else {
        return Ok(());
    };
    let malformed = |message: &str| MalformedEntity {
        entity_id: entity.id.clone(),
        message: message.to_string(),
    };

    match update.trip.schedule_relationship {
        ScheduleRelationship::Scheduled => {
            let trip_id = update
                .trip
                .trip_id
                .as_deref()
                .ok_or_else(|| malformed("scheduled trip without trip_id"))?;
            for stu in &update.stop_time_update {
                let Some(stop_id) = &stu.stop_id else {
                    continue;
                };
                let delay = stu
                    .arrival
                    .as_ref()
                    .and_then(|e| e.delay)
                    .or_else(|| stu.departure.as_ref().and_then(|e| e.delay))
                    .unwrap_or(0);
                snapshot
                    .delta
                    .record(TripId::new(trip_id), StopId::new(stop_id.as_str()), delay);
            }
        }
        ScheduleRelationship::Canceled => {
            let trip_id = update
                .trip
                .trip_id
                .as_deref()
                .ok_or_else(|| malformed("canceled trip without trip_id"))?;
            snapshot.canceled.insert(TripId::new(trip_id));
        }
        ScheduleRelationship::Added => {
            let added = added_arrivals(&update, ctx).map_err(|m| malformed(&m))?;
            for arrival in &added {
                info!(
                    route = %arrival.route,
                    stop = %arrival.stop_code,
                    destination = %arrival.destination,
                    due_in_seconds = arrival.due_in_seconds(&ctx.now),
                    "added trip"
                );
            }
            snapshot.added.extend(added);
        }
        other => {
            warn!(entity = %entity.id, relationship = ?other, "unsupported schedule relationship");
        }
    }
    Ok(())
}

fn added_arrivals(update: &TripUpdate, ctx: &ParseContext<'_>) -> Result<Vec<AddedArrival>, String> {
    let trip = &update.trip;
    let Some(route_id) = trip.route_id.as_deref().map(RouteId::new) else {
        return Err("added trip without route_id".to_string());
    };
    if !ctx.relevant_routes.contains(&route_id) {
        return Ok(Vec::new());
    }
    if !starts_today_not_in_future(trip, &ctx.now)? {
        return Ok(Vec::new());
    }
    // relevant_routes only holds indexed routes
    let Some(route) = ctx.index.route(&route_id) else {
        return Ok(Vec::new());
    };
    let destination = ctx
        .index
        .headsign_for(&route_id, trip.direction_id)
        .unwrap_or(route.long_name.as_str())
        .to_string();

    let mut added = Vec::new();
    for stu in &update.stop_time_update {
        let Some(stop) = stu
            .stop_id
            .as_deref()
            .and_then(|id| ctx.index.stop(&StopId::new(id)))
        else {
            continue;
        };
        let Some(at) = stu.event().and_then(|e| e.time) else {
            continue;
        };
        if at < ctx.now.epoch_secs() {
            continue;
        }
        added.push(AddedArrival {
            stop_id: stop.stop_id.clone(),
            stop_code: stop.stop_code.clone(),
            route: route.short_name.clone(),
            destination: destination.clone(),
            arrival_epoch_secs: at,
        });
    }
    Ok(added)
}

/// Absent start fields are taken as "today" and "already started".
fn starts_today_not_in_future(trip: &TripDescriptor, now: &Now) -> Result<bool, String> {
    if let Some(date) = &trip.start_date {
        let date = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|e| format!("bad start_date {date:?}: {e}"))?;
        if date != now.date() {
            return Ok(false);
        }
    }
    if let Some(time) = &trip.start_time {
        let time = ServiceTime::parse(time).map_err(|e| e.to_string())?;
        if time > now.time_of_day() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Seconds from `now` until `scheduled`, both on the same service-day
/// scale. A time at or before `now` is taken to be tomorrow.
pub fn seconds_until(scheduled: ServiceTime, now: ServiceTime) -> i64 {
    let tstop = i64::from(scheduled.seconds());
    let tnow = i64::from(now.seconds());
    if tstop > tnow {
        tstop - tnow
    } else {
        tstop + SECONDS_PER_DAY - tnow
    }
}

/// Merge the snapshot into the projected visits.
///
/// Canceled trips are dropped whatever their delay. Added arrivals are
/// re-timed against `now` and dropped once past.
pub fn apply(
    index: &ScheduleIndex,
    projected: &[ProjectedVisit],
    snapshot: &RealtimeSnapshot,
    now: &Now,
) -> Vec<ArrivalTime> {
    let now_tod = now.time_of_day();
    let mut arrivals = Vec::with_capacity(projected.len() + snapshot.added.len());

    for visit in projected {
        if snapshot.canceled.contains(&visit.trip_id) {
            continue;
        }
        let Some(trip) = index.trip(&visit.trip_id) else {
            continue;
        };
        let (Some(route), Some(stop)) = (index.route(&trip.route_id), index.stop(&visit.stop_id))
        else {
            continue;
        };
        let delay = snapshot.delta.delay_for(&visit.trip_id, &visit.stop_id);
        if delay != 0 {
            debug!(route = %route.short_name, stop = %visit.stop_id, delay, "applying delay");
        }
        arrivals.push(ArrivalTime {
            stop_id: visit.stop_id.clone(),
            stop_code: stop.stop_code.clone(),
            route: route.short_name.clone(),
            destination: trip.headsign.clone(),
            due_in_seconds: seconds_until(visit.scheduled, now_tod) + i64::from(delay),
            is_added: false,
        });
    }

    arrivals.extend(
        snapshot
            .added
            .iter()
            .filter(|a| a.due_in_seconds(now) >= 0)
            .map(|a| a.to_arrival(now)),
    );

    sort_by_due(&mut arrivals);
    arrivals
}
