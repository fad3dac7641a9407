//! Itineraries reconstructed from a traversal result.
//!
//! Every reachable stop's label names the next stop and how to get there,
//! so following predecessors from any stop spells out a journey that
//! leaves at that stop's latest departure and arrives by the target.

use crate::domain::{ServiceTime, StopId, TripId};
use crate::traversal::{ReachMap, Via};

/// Error reconstructing an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItineraryError {
    /// The start stop is not in the result
    #[error("unknown stop: {0}")]
    UnknownStop(String),

    /// The start stop cannot reach the destination
    #[error("{0} cannot reach the destination in time")]
    Unreachable(String),

    /// A predecessor chain is inconsistent or never ends
    #[error("broken predecessor chain at {0}")]
    BrokenChain(String),
}

/// A ride on one trip across one or more consecutive legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ride {
    pub trip_id: TripId,
    /// Boarding stop
    pub from: StopId,
    /// Alighting stop
    pub to: StopId,
    /// Latest departure from the boarding stop
    pub departure: ServiceTime,
    /// Stops passed through without alighting
    pub via_stops: Vec<StopId>,
}

/// A walking transfer between stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub from: StopId,
    pub to: StopId,
    pub departure: ServiceTime,
    pub duration_secs: u32,
}

/// A segment of an itinerary: either a ride or a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Ride(Ride),
    Walk(Walk),
}

impl Segment {
    pub fn origin(&self) -> &StopId {
        match self {
            Segment::Ride(ride) => &ride.from,
            Segment::Walk(walk) => &walk.from,
        }
    }

    pub fn destination(&self) -> &StopId {
        match self {
            Segment::Ride(ride) => &ride.to,
            Segment::Walk(walk) => &walk.to,
        }
    }
}

/// A journey from some stop to the destination.
///
/// # Invariants
///
/// - Consecutive segments connect (destination of one = origin of next)
/// - The last segment ends at the destination
/// - Empty only when the start stop is the destination itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Itinerary {
    pub origin: StopId,
    pub destination: StopId,
    /// Latest departure from the origin
    pub departure: ServiceTime,
    /// Arrival deadline at the destination
    pub target: ServiceTime,
    pub segments: Vec<Segment>,
}

impl Itinerary {
    /// Follow predecessors from `start` to the destination of `map`.
    pub fn reconstruct(map: &ReachMap, start: &StopId) -> Result<Self, ItineraryError> {
        let entry = map
            .get(start)
            .ok_or_else(|| ItineraryError::UnknownStop(start.to_string()))?;
        let departure = entry
            .label
            .departure
            .ok_or_else(|| ItineraryError::Unreachable(start.to_string()))?;

        let mut segments: Vec<Segment> = Vec::new();
        let mut current = start.clone();

        let mut hops = 0usize;

        while current != map.destination {
            // A valid chain visits each stop at most once.
            if hops >= map.stops.len() {
                return Err(ItineraryError::BrokenChain(current.to_string()));
            }
            hops += 1;

            let label = &map
                .get(&current)
                .ok_or_else(|| ItineraryError::BrokenChain(current.to_string()))?
                .label;
            let (Some(leave), Some(next), Some(via)) =
                (label.departure, label.predecessor.clone(), label.via.clone())
            else {
                return Err(ItineraryError::BrokenChain(current.to_string()));
            };

            match via {
                Via::Trip(trip_id) => match segments.last_mut() {
                    Some(Segment::Ride(ride)) if ride.trip_id == trip_id => {
                        ride.via_stops.push(ride.to.clone());
                        ride.to = next.clone();
                    }
                    _ => segments.push(Segment::Ride(Ride {
                        trip_id,
                        from: current.clone(),
                        to: next.clone(),
                        departure: leave,
                        via_stops: Vec::new(),
                    })),
                },
                Via::Transfer => {
                    let arrive = map
                        .departure(&next)
                        .ok_or_else(|| ItineraryError::BrokenChain(next.to_string()))?;
                    let duration_secs = u32::try_from(arrive.signed_secs_since(leave))
                        .map_err(|_| ItineraryError::BrokenChain(current.to_string()))?;
                    segments.push(Segment::Walk(Walk {
                        from: current.clone(),
                        to: next.clone(),
                        departure: leave,
                        duration_secs,
                    }));
                }
            }

            current = next;
        }

        Ok(Self {
            origin: start.clone(),
            destination: map.destination.clone(),
            departure,
            target: map.target,
            segments,
        })
    }

    /// Number of rides taken.
    pub fn ride_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Ride(_)))
            .count()
    }

    /// Slack between leaving the origin and the target, in seconds.
    pub fn total_secs(&self) -> i64 {
        self.target.signed_secs_since(self.departure)
    }
}
