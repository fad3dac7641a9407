//! In-memory schedule store.
//!
//! Holds a full snapshot of stops, calendared trip legs and typed transfers.
//! It can be built in code or loaded from a JSON feed file, and applies the
//! same calendar and transfer-type filtering as the relational store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    Edge, ServiceCalendar, ServiceTime, Stop, StopId, Transfer, TransferKind, TripId,
};

use super::ScheduleError;
use super::ScheduleStore;

/// A trip leg together with the calendar that governs it.
#[derive(Debug, Clone)]
struct ScheduledEdge {
    edge: Edge,
    calendar: Arc<ServiceCalendar>,
}

/// Schedule snapshot held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchedule {
    stops: Vec<Stop>,
    edges: Vec<ScheduledEdge>,
    transfers: Vec<(Transfer, TransferKind)>,
}

impl InMemorySchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stop.
    pub fn add_stop(&mut self, stop: Stop) {
        self.stops.push(stop);
    }

    /// Add a trip leg valid on the dates covered by `calendar`.
    pub fn add_edge(&mut self, edge: Edge, calendar: Arc<ServiceCalendar>) {
        self.edges.push(ScheduledEdge { edge, calendar });
    }

    /// Add a transfer of the given kind.
    ///
    /// Only [`TransferKind::MinimumTime`] transfers are ever returned by
    /// [`ScheduleStore::all_transfers`].
    pub fn add_transfer(&mut self, transfer: Transfer, kind: TransferKind) {
        self.transfers.push((transfer, kind));
    }

    /// Number of stops.
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Number of trip legs across all calendars.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Load a schedule from a JSON feed file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let schedule = Self::from_json_str(&json)?;
        debug!(
            path = %path.display(),
            stops = schedule.stops.len(),
            edges = schedule.edges.len(),
            transfers = schedule.transfers.len(),
            "loaded feed file"
        );
        Ok(schedule)
    }

    /// Parse a schedule from JSON feed text.
    pub fn from_json_str(json: &str) -> Result<Self, ScheduleError> {
        let feed: FeedFile = serde_json::from_str(json)?;
        Self::from_feed(feed)
    }

    /// Build a schedule from a parsed feed.
    ///
    /// Every trip leg must reference a calendar defined in the feed.
    pub fn from_feed(feed: FeedFile) -> Result<Self, ScheduleError> {
        let calendars: HashMap<String, Arc<ServiceCalendar>> = feed
            .calendars
            .into_iter()
            .map(|(service_id, calendar)| (service_id, Arc::new(calendar)))
            .collect();

        let mut schedule = Self::new();
        for stop in feed.stops {
            schedule.add_stop(stop);
        }

        for leg in feed.edges {
            let calendar = calendars.get(&leg.service_id).ok_or_else(|| {
                ScheduleError::MalformedData(format!(
                    "trip {} references unknown service {}",
                    leg.trip_id, leg.service_id
                ))
            })?;
            schedule.add_edge(
                Edge::new(leg.from, leg.to, leg.departure, leg.arrival, leg.trip_id),
                calendar.clone(),
            );
        }

        for transfer in feed.transfers {
            let kind = TransferKind::from_code(transfer.transfer_type).ok_or_else(|| {
                ScheduleError::MalformedData(format!(
                    "unknown transfer_type {} for {} -> {}",
                    transfer.transfer_type, transfer.from, transfer.to
                ))
            })?;
            let min_transfer_secs = match (kind, transfer.min_transfer_time) {
                (_, Some(secs)) => secs,
                (TransferKind::MinimumTime, None) => {
                    return Err(ScheduleError::MalformedData(format!(
                        "minimum-time transfer {} -> {} has no min_transfer_time",
                        transfer.from, transfer.to
                    )));
                }
                (_, None) => 0,
            };
            schedule.add_transfer(
                Transfer::new(transfer.from, transfer.to, min_transfer_secs),
                kind,
            );
        }

        Ok(schedule)
    }
}

impl ScheduleStore for InMemorySchedule {
    async fn list_stops(&self) -> Result<Vec<Stop>, ScheduleError> {
        Ok(self.stops.clone())
    }

    async fn edges_in_window(
        &self,
        date: NaiveDate,
        start: ServiceTime,
        end: ServiceTime,
    ) -> Result<Vec<Edge>, ScheduleError> {
        Ok(self
            .edges
            .iter()
            .filter(|s| s.edge.departure >= start && s.edge.departure <= end)
            .filter(|s| s.calendar.covers(date))
            .map(|s| s.edge.clone())
            .collect())
    }

    async fn all_transfers(&self) -> Result<Vec<Transfer>, ScheduleError> {
        Ok(self
            .transfers
            .iter()
            .filter(|(_, kind)| *kind == TransferKind::MinimumTime)
            .map(|(transfer, _)| transfer.clone())
            .collect())
    }
}

/// On-disk layout of a JSON feed file.
///
/// ```json
/// {
///   "stops": [{"id": "A", "name": "Alpha", "lat": 47.0, "lon": 8.0}],
///   "calendars": {"WD": {"monday": true, "start_date": "2023-01-01", "end_date": "2023-12-31"}},
///   "edges": [{"from": "B", "to": "A", "departure": "08:00", "arrival": "08:10",
///              "trip_id": "T1", "service_id": "WD"}],
///   "transfers": [{"from": "D", "to": "B", "transfer_type": 2, "min_transfer_time": 300}]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedFile {
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub calendars: HashMap<String, ServiceCalendar>,
    #[serde(default)]
    pub edges: Vec<FeedEdge>,
    #[serde(default)]
    pub transfers: Vec<FeedTransfer>,
}

/// A trip leg in a feed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEdge {
    pub from: StopId,
    pub to: StopId,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    pub trip_id: TripId,
    pub service_id: String,
}

/// A transfer in a feed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedTransfer {
    pub from: StopId,
    pub to: StopId,
    pub transfer_type: i32,
    #[serde(default)]
    pub min_transfer_time: Option<u32>,
}
