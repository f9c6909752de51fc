//! Bus arrivals board server.
//!
//! Answers "when is the next bus at the stops near me?" by projecting the
//! static GTFS timetable forward from now and correcting it with the
//! GTFS-Realtime trip updates feed.

pub mod app;
pub mod config;
pub mod domain;
pub mod feed;
pub mod filter;
pub mod realtime;
pub mod refresh;
pub mod web;
