//! The schedule narrowed to the configured stops.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{info, warn};

use crate::config::ConfigurationError;
use crate::domain::{RouteId, ServiceId, StopCode, StopId, TripId};

use super::tables::{Calendar, FeedTables, Route, Stop, StopTime, Trip};

/// Read-only view of the static schedule for a fixed set of stops.
///
/// Built once at startup and shared by every refresh cycle. Every trip in
/// the index has both its route and its calendar present, and every stop
/// time belongs to an indexed trip at an indexed stop.
#[derive(Debug, Clone)]
pub struct ScheduleIndex {
    stops: HashMap<StopId, Stop>,
    stop_ids_by_code: HashMap<StopCode, Vec<StopId>>,
    trips: HashMap<TripId, Trip>,
    routes: HashMap<RouteId, Route>,
    stop_times: Vec<StopTime>,
    calendars: Vec<Calendar>,
    /// First headsign seen per (route, direction), for added trips.
    headsigns: HashMap<(RouteId, Option<u8>), String>,
}

impl ScheduleIndex {
    /// Filter `tables` down to `stop_codes`.
    pub fn build(tables: FeedTables, stop_codes: &[StopCode]) -> Result<Self, ConfigurationError> {
        let wanted: HashSet<&StopCode> = stop_codes.iter().collect();

        let mut stops = HashMap::new();
        let mut stop_ids_by_code: HashMap<StopCode, Vec<StopId>> = HashMap::new();
        for stop in tables.stops {
            if !wanted.contains(&stop.stop_code) {
                continue;
            }
            stop_ids_by_code
                .entry(stop.stop_code.clone())
                .or_default()
                .push(stop.stop_id.clone());
            stops.insert(stop.stop_id.clone(), stop);
        }

        if stops.is_empty() {
            return Err(ConfigurationError::NoMatchingStops {
                codes: stop_codes.to_vec(),
            });
        }
        for code in stop_codes {
            if !stop_ids_by_code.contains_key(code) {
                warn!(stop_code = %code, "configured stop code not found in static feed");
            }
        }

        let routes: HashMap<RouteId, Route> = tables
            .routes
            .into_iter()
            .map(|r| (r.route_id.clone(), r))
            .collect();
        let calendar_ids: HashSet<ServiceId> = tables
            .calendars
            .iter()
            .map(|c| c.service_id.clone())
            .collect();

        // A trip without its route or calendar can never be displayed
        let mut trips = HashMap::new();
        let mut dropped_trips = 0usize;
        for trip in tables.trips {
            if routes.contains_key(&trip.route_id) && calendar_ids.contains(&trip.service_id) {
                trips.insert(trip.trip_id.clone(), trip);
            } else {
                dropped_trips += 1;
            }
        }
        if dropped_trips > 0 {
            warn!(
                dropped_trips,
                "trips without a matching route or calendar were dropped"
            );
        }

        let stop_times: Vec<StopTime> = tables
            .stop_times
            .into_iter()
            .filter(|st| stops.contains_key(&st.stop_id) && trips.contains_key(&st.trip_id))
            .collect();

        let referenced: HashSet<&TripId> = stop_times.iter().map(|st| &st.trip_id).collect();
        trips.retain(|id, _| referenced.contains(id));

        let used_routes: HashSet<&RouteId> = trips.values().map(|t| &t.route_id).collect();
        let used_services: HashSet<&ServiceId> = trips.values().map(|t| &t.service_id).collect();
        let routes: HashMap<RouteId, Route> = routes
            .into_iter()
            .filter(|(id, _)| used_routes.contains(id))
            .collect();
        let calendars: Vec<Calendar> = tables
            .calendars
            .into_iter()
            .filter(|c| used_services.contains(&c.service_id))
            .collect();

        let mut headsigns = HashMap::new();
        // Stop time order is file order; iterate it so "first seen" is stable
        for st in &stop_times {
            if let Some(trip) = trips.get(&st.trip_id) {
                headsigns
                    .entry((trip.route_id.clone(), trip.direction_id))
                    .or_insert_with(|| trip.headsign.clone());
            }
        }

        info!(
            stops = stops.len(),
            trips = trips.len(),
            routes = routes.len(),
            stop_times = stop_times.len(),
            calendars = calendars.len(),
            "schedule index built"
        );

        Ok(Self {
            stops,
            stop_ids_by_code,
            trips,
            routes,
            stop_times,
            calendars,
            headsigns,
        })
    }

    pub fn stop(&self, id: &StopId) -> Option<&Stop> {
        self.stops.get(id)
    }

    pub fn trip(&self, id: &TripId) -> Option<&Trip> {
        self.trips.get(id)
    }

    pub fn route(&self, id: &RouteId) -> Option<&Route> {
        self.routes.get(id)
    }

    /// Every indexed stop id.
    pub fn stop_ids(&self) -> HashSet<StopId> {
        self.stops.keys().cloned().collect()
    }

    /// Stop ids sharing a public stop code. Empty for unknown codes.
    pub fn stop_ids_for_code(&self, code: &StopCode) -> &[StopId] {
        self.stop_ids_by_code
            .get(code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stop_times(&self) -> &[StopTime] {
        &self.stop_times
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    /// Routes with at least one indexed trip on one of `services`.
    pub fn routes_for_services(&self, services: &BTreeSet<ServiceId>) -> HashSet<RouteId> {
        self.trips
            .values()
            .filter(|t| services.contains(&t.service_id))
            .map(|t| t.route_id.clone())
            .collect()
    }

    /// Headsign of the first indexed trip on `route` in `direction`.
    pub fn headsign_for(&self, route: &RouteId, direction: Option<u8>) -> Option<&str> {
        self.headsigns
            .get(&(route.clone(), direction))
            .map(String::as_str)
    }
}
