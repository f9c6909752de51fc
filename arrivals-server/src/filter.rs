//! Per-stop route allow lists.
//!
//! One public stop code can cover several platforms in the static feed, so
//! a stop can show routes the rider never takes from it. Each stop may list
//! the route names worth showing; stops with no list show everything.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::{ArrivalTime, StopCode, StopId};
use crate::feed::ScheduleIndex;

#[derive(Debug, Clone, Default)]
pub struct RouteStopFilter {
    allowed: HashMap<StopId, HashSet<String>>,
}

impl RouteStopFilter {
    pub fn new(allowed: HashMap<StopId, HashSet<String>>) -> Self {
        Self { allowed }
    }

    /// Resolve per-code lists to every stop id sharing that code.
    pub fn from_stop_codes(
        index: &ScheduleIndex,
        routes_for_stops: &HashMap<StopCode, HashSet<String>>,
    ) -> Self {
        let mut allowed: HashMap<StopId, HashSet<String>> = HashMap::new();
        for (code, routes) in routes_for_stops {
            let ids = index.stop_ids_for_code(code);
            if ids.is_empty() {
                warn!(stop_code = %code, "route filter for unknown stop code ignored");
            }
            for id in ids {
                allowed
                    .entry(id.clone())
                    .or_default()
                    .extend(routes.iter().cloned());
            }
        }
        Self { allowed }
    }

    /// Whether `route` may be shown at `stop`.
    pub fn allows(&self, stop: &StopId, route: &str) -> bool {
        match self.allowed.get(stop) {
            Some(routes) if !routes.is_empty() => routes.contains(route),
            _ => true,
        }
    }

    pub fn retain(&self, arrivals: &mut Vec<ArrivalTime>) {
        let before = arrivals.len();
        arrivals.retain(|a| self.allows(&a.stop_id, &a.route));
        let removed = before - arrivals.len();
        if removed > 0 {
            debug!(removed, "arrivals hidden by route filter");
        }
    }
}
