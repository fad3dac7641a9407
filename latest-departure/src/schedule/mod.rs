//! Schedule stores.
//!
//! A schedule store holds, per service date, the directed time-stamped trip
//! legs and the static minimum-time transfers between stops, plus the stop
//! reference data. The traversal only sees the [`ScheduleStore`] trait, so
//! it can run against an in-memory snapshot, a JSON feed file or the
//! relational store.

mod config;
mod error;
mod memory;
mod postgres;

use std::future::Future;

use chrono::NaiveDate;

use crate::domain::{Edge, ServiceTime, Stop, Transfer};

pub use config::DatabaseConfig;
pub use error::ScheduleError;
pub use memory::{FeedFile, InMemorySchedule};
pub use postgres::PostgresSchedule;

/// Source of stops, windowed trip legs and transfers.
///
/// Constructed once by the caller and shared by reference with every
/// traversal that needs it.
pub trait ScheduleStore {
    /// Full snapshot of all stops.
    fn list_stops(&self) -> impl Future<Output = Result<Vec<Stop>, ScheduleError>> + Send;

    /// Trip legs departing within `[start, end]` (inclusive) whose calendar
    /// covers `date`.
    fn edges_in_window(
        &self,
        date: NaiveDate,
        start: ServiceTime,
        end: ServiceTime,
    ) -> impl Future<Output = Result<Vec<Edge>, ScheduleError>> + Send;

    /// All minimum-time transfers, regardless of time of day.
    fn all_transfers(&self) -> impl Future<Output = Result<Vec<Transfer>, ScheduleError>> + Send;
}
