//! Latest-departure reachability over a transit schedule.
//!
//! Answers: "to reach this stop by this time, what is the latest I can
//! leave from every other stop?"

pub mod batch;
pub mod cache;
pub mod domain;
pub mod itinerary;
pub mod report;
pub mod schedule;
pub mod traversal;
