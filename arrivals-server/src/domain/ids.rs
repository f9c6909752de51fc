//! Identifier newtypes for static feed entities.
//!
//! GTFS identifiers are opaque strings. Wrapping each kind in its own type
//! keeps a trip id from being looked up in the stop table by accident.

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// `stop_id` from `stops.txt`; what stop times and realtime updates reference.
    StopId
);

string_id!(
    /// `stop_code`: the public number printed on the stop pole, used in configuration.
    ///
    /// Several `StopId`s may share one code when a stop has multiple platforms.
    StopCode
);

string_id!(
    /// `trip_id` from `trips.txt`.
    TripId
);

string_id!(
    /// `route_id` from `routes.txt`.
    RouteId
);

string_id!(
    /// `service_id` linking trips to `calendar.txt`.
    ServiceId
);
