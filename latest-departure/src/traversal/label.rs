//! Per-stop labels and the traversal's output mapping.

use std::collections::BTreeMap;

use crate::domain::{ServiceTime, Stop, StopId, TripId};

/// What produced a label: a scheduled trip or a walking transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Via {
    Trip(TripId),
    Transfer,
}

impl Via {
    /// Marker string used for transfers in rendered output.
    pub const TRANSFER_MARKER: &'static str = "transfer";

    /// The trip id, or the transfer marker.
    pub fn as_str(&self) -> &str {
        match self {
            Via::Trip(trip) => trip.as_str(),
            Via::Transfer => Self::TRANSFER_MARKER,
        }
    }
}

/// Latest feasible departure from a stop and the next stop on that chain.
///
/// `departure == None` means the destination cannot be reached from this
/// stop within the query bounds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Label {
    pub departure: Option<ServiceTime>,
    pub predecessor: Option<StopId>,
    pub via: Option<Via>,
}

impl Label {
    /// Label of a stop not (yet) reached.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Label of the destination itself.
    pub fn destination(target: ServiceTime) -> Self {
        Self {
            departure: Some(target),
            predecessor: None,
            via: None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.departure.is_some()
    }
}

/// A stop together with its final label.
#[derive(Debug, Clone, PartialEq)]
pub struct StopLabel {
    pub stop: Stop,
    pub label: Label,
}

/// Counters describing one traversal run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Stops extracted from the queue and fixed.
    pub stops_fixed: usize,
    /// Successful label improvements.
    pub improvements: usize,
    /// Edge loads from the schedule store, including the initial one.
    pub window_loads: usize,
    /// Trip legs received across all window loads.
    pub edges_loaded: usize,
}

/// Result of a traversal: every known stop mapped to its label.
#[derive(Debug, Clone)]
pub struct ReachMap {
    pub destination: StopId,
    pub target: ServiceTime,
    pub earliest_departure: ServiceTime,
    pub stops: BTreeMap<StopId, StopLabel>,
    /// Stops in the order they were fixed, destination first.
    pub finalized: Vec<StopId>,
    pub stats: TraversalStats,
}

impl ReachMap {
    pub fn get(&self, id: &StopId) -> Option<&StopLabel> {
        self.stops.get(id)
    }

    /// Latest departure from `id`, `None` if unknown or unreachable.
    pub fn departure(&self, id: &StopId) -> Option<ServiceTime> {
        self.stops.get(id).and_then(|s| s.label.departure)
    }

    /// Stops with a reachable label.
    pub fn reachable(&self) -> impl Iterator<Item = &StopLabel> {
        self.stops.values().filter(|s| s.label.is_reachable())
    }

    /// Number of stops with a reachable label.
    pub fn reachable_count(&self) -> usize {
        self.reachable().count()
    }

    /// First stop with the given display name, in id order.
    pub fn find_by_name(&self, name: &str) -> Option<&StopLabel> {
        self.stops.values().find(|s| s.stop.name == name)
    }
}
