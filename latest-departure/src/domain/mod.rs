//! Domain types for latest-departure search.
//!
//! This module contains the schedule vocabulary shared by the stores and
//! the traversal: stops, service times, calendars, trip legs and transfers.
//! Identifier types validate at construction time, so code that receives
//! them can trust their validity.

mod calendar;
mod edge;
mod stop;
mod time;

pub use calendar::{ServiceCalendar, weekday_column};
pub use edge::{Edge, Transfer, TransferKind, TripId};
pub use stop::{InvalidStopId, Stop, StopId};
pub use time::{SECS_PER_HOUR, ServiceTime, TimeError};
