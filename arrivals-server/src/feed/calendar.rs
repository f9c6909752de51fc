//! Which services run on which day.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

use crate::domain::{Now, SECONDS_PER_DAY, ServiceId};

use super::tables::Calendar;

/// Services running on one service day, and where that day sits relative
/// to today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDay {
    /// 0 for today, -1 for yesterday.
    pub offset_days: i64,
    pub date: NaiveDate,
    pub services: BTreeSet<ServiceId>,
}

impl ServiceDay {
    /// Seconds to add to a stop time on this service day to put it on
    /// today's scale.
    pub fn offset_seconds(&self) -> i64 {
        self.offset_days * SECONDS_PER_DAY
    }
}

/// The service days a refresh cycle has to look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDays(Vec<ServiceDay>);

impl ServiceDays {
    pub fn new(days: Vec<ServiceDay>) -> Self {
        Self(days)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDay> {
        self.0.iter()
    }

    /// True when no service runs on any of the days.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|d| d.services.is_empty())
    }

    /// Union of services over all days.
    pub fn all_services(&self) -> BTreeSet<ServiceId> {
        self.0
            .iter()
            .flat_map(|d| d.services.iter().cloned())
            .collect()
    }

    /// Services running today.
    pub fn today(&self) -> BTreeSet<ServiceId> {
        self.0
            .iter()
            .filter(|d| d.offset_days == 0)
            .flat_map(|d| d.services.iter().cloned())
            .collect()
    }
}

pub struct ServiceCalendarResolver<'a> {
    calendars: &'a [Calendar],
}

impl<'a> ServiceCalendarResolver<'a> {
    pub fn new(calendars: &'a [Calendar]) -> Self {
        Self { calendars }
    }

    /// Services whose date range covers `date` and whose weekday flag for
    /// `date` is set.
    pub fn active_services(&self, date: NaiveDate) -> BTreeSet<ServiceId> {
        self.calendars
            .iter()
            .filter(|c| c.runs_on(date))
            .map(|c| c.service_id.clone())
            .collect()
    }

    /// Today's services plus yesterday's.
    ///
    /// Trips on yesterday's service day may carry stop times past 24:00:00
    /// that fall after midnight today, so both days are returned. Nothing
    /// running today is logged and returned as is.
    pub fn service_days(&self, now: &Now) -> ServiceDays {
        let today = now.date();
        let today_services = self.active_services(today);
        if today_services.is_empty() {
            warn!(date = %today, "no services active today");
        }

        let mut days = vec![ServiceDay {
            offset_days: 0,
            date: today,
            services: today_services,
        }];

        if let Some(yesterday) = today.checked_sub_days(Days::new(1)) {
            let services = self.active_services(yesterday);
            debug!(date = %yesterday, services = services.len(), "previous service day");
            days.push(ServiceDay {
                offset_days: -1,
                date: yesterday,
                services,
            });
        }

        ServiceDays(days)
    }
}
