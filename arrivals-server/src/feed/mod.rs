//! Static GTFS schedule: download, streaming load, and the queries a
//! refresh cycle makes against it.

mod calendar;
mod download;
mod error;
#[cfg(test)]
pub(crate) mod fixture;
mod index;
mod loader;
mod projector;
pub mod tables;

pub use calendar::{ServiceCalendarResolver, ServiceDay, ServiceDays};
pub use download::{FeedDownloader, ensure_archive};
pub use error::FeedError;
pub use index::ScheduleIndex;
pub use loader::{load_from_archive, load_tables};
pub use projector::{ArrivalProjector, ProjectedVisit};

#[cfg(test)]
pub(crate) use loader::test_archive;
