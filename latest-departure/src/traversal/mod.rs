//! Latest-departure search.
//!
//! This module implements the core algorithm that answers: "from every
//! stop, what is the latest I can leave and still reach the destination by
//! the target time?"
//!
//! The traversal runs backwards from the destination over a sliding window
//! of the schedule, fixing stops in order of decreasing departure time with
//! the help of a decrease-only priority queue.

mod config;
mod engine;
mod label;
mod queue;

pub use config::TraversalConfig;
pub use engine::{Destination, Query, Traversal, TraversalError};
pub use label::{Label, ReachMap, StopLabel, TraversalStats, Via};
pub use queue::{DecreaseQueue, QueueError};
