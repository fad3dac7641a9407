//! Windowed backward latest-departure traversal.
//!
//! Starting from the destination at the target time, the traversal walks
//! the network backwards: a stop's label is the latest time one can leave
//! it and still arrive by the target. Labels are fixed in non-increasing
//! order of departure, as in Dijkstra's algorithm with "latest" in place of
//! "shortest".
//!
//! Trip legs are loaded one window at a time. The first window ends at the
//! target time and reaches back one increment; whenever no stop can be
//! fixed with what is loaded, the window slides back by another increment,
//! the legs for the new window are loaded, and every fixed stop is relaxed
//! again against them. The traversal ends when the queue is empty or the
//! window reaches the earliest-departure cutoff. Transfers are calendar
//! independent and are loaded once.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::future::Future;

use chrono::NaiveDate;
use tracing::{debug, trace, warn};

use crate::domain::{Edge, ServiceTime, Stop, StopId, Transfer, TripId};
use crate::schedule::{ScheduleError, ScheduleStore};

use super::config::TraversalConfig;
use super::label::{Label, ReachMap, StopLabel, TraversalStats, Via};
use super::queue::{DecreaseQueue, QueueError};

/// Error from a traversal.
#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// The destination does not match any known stop
    #[error("no such stop: {0}")]
    UnknownDestination(String),

    /// The query or configuration cannot be run
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The schedule store failed or timed out
    #[error("schedule store failed: {0}")]
    Schedule(#[from] ScheduleError),

    /// The priority queue was used against its contract
    #[error("priority queue invariant violated: {0}")]
    Queue(#[from] QueueError),
}

/// How the destination stop is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Display name; the first stop with exactly this name is used.
    Name(String),
    /// Stable stop id.
    Id(StopId),
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Name(name) => f.write_str(name),
            Destination::Id(id) => write!(f, "{id}"),
        }
    }
}

/// A latest-departure query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Stop that must be reached.
    pub destination: Destination,
    /// Service date.
    pub date: NaiveDate,
    /// Arrival deadline at the destination.
    pub target: ServiceTime,
    /// No departure before this time is considered.
    pub earliest_departure: ServiceTime,
}

impl Query {
    /// Create a query with the cutoff at midnight.
    pub fn new(destination: Destination, date: NaiveDate, target: ServiceTime) -> Self {
        Self {
            destination,
            date,
            target,
            earliest_departure: ServiceTime::MIDNIGHT,
        }
    }

    /// Set the earliest allowed departure.
    pub fn with_earliest_departure(mut self, earliest_departure: ServiceTime) -> Self {
        self.earliest_departure = earliest_departure;
        self
    }

    /// Validate the query.
    pub fn validate(&self) -> Result<(), TraversalError> {
        if self.earliest_departure > self.target {
            return Err(TraversalError::InvalidQuery(format!(
                "earliest departure {} is after target time {}",
                self.earliest_departure, self.target
            )));
        }
        Ok(())
    }
}

/// The span of departure times whose trip legs are currently loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    lb: ServiceTime,
    ub: ServiceTime,
}

impl Window {
    fn initial(target: ServiceTime, cutoff: ServiceTime, increment: u32) -> Self {
        Self {
            lb: target.saturating_sub_secs(increment).max(cutoff),
            ub: target,
        }
    }

    fn slide(&mut self, cutoff: ServiceTime, increment: u32) {
        self.lb = self.lb.saturating_sub_secs(increment).max(cutoff);
        self.ub = self.ub.saturating_sub_secs(increment).max(cutoff);
    }
}

/// A loaded trip leg, indexed by its arrival stop.
#[derive(Debug, Clone)]
struct InEdge {
    from: usize,
    departure: ServiceTime,
    arrival: ServiceTime,
    trip_id: TripId,
}

/// A transfer, indexed by the stop it leads to.
#[derive(Debug, Clone, Copy)]
struct InTransfer {
    from: usize,
    min_transfer_secs: u32,
}

type OrderFn = fn(&Option<ServiceTime>) -> Reverse<Option<ServiceTime>>;
type LabelQueue = DecreaseQueue<usize, Option<ServiceTime>, Reverse<Option<ServiceTime>>, OrderFn>;

/// Latest departure first; unreachable last.
fn latest_first(departure: &Option<ServiceTime>) -> Reverse<Option<ServiceTime>> {
    Reverse(*departure)
}

/// Backward edges and transfers into each stop.
#[derive(Debug, Default)]
struct BackwardGraph {
    in_edges: HashMap<usize, Vec<InEdge>>,
    in_transfers: HashMap<usize, Vec<InTransfer>>,
}

impl BackwardGraph {
    /// Replace the loaded trip legs. Legs touching unknown stops are dropped.
    fn load_edges(&mut self, edges: Vec<Edge>, index: &HashMap<StopId, usize>) {
        self.in_edges.clear();
        let mut skipped = 0usize;
        for edge in edges {
            match (index.get(&edge.from), index.get(&edge.to)) {
                (Some(&from), Some(&to)) => self.in_edges.entry(to).or_default().push(InEdge {
                    from,
                    departure: edge.departure,
                    arrival: edge.arrival,
                    trip_id: edge.trip_id,
                }),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            trace!(skipped, "dropped legs touching unknown stops");
        }
    }

    fn load_transfers(&mut self, transfers: Vec<Transfer>, index: &HashMap<StopId, usize>) {
        self.in_transfers.clear();
        for transfer in transfers {
            if let (Some(&from), Some(&to)) = (index.get(&transfer.from), index.get(&transfer.to)) {
                self.in_transfers.entry(to).or_default().push(InTransfer {
                    from,
                    min_transfer_secs: transfer.min_transfer_secs,
                });
            }
        }
    }
}

/// Mutable per-query label state.
struct LabelState {
    labels: Vec<Label>,
    fixed: Vec<bool>,
    fixed_order: Vec<usize>,
    queue: LabelQueue,
    cutoff: ServiceTime,
    stats: TraversalStats,
}

impl LabelState {
    fn new(stop_count: usize, destination: usize, query: &Query) -> Result<Self, QueueError> {
        let mut labels = vec![Label::unreachable(); stop_count];
        labels[destination] = Label::destination(query.target);

        let mut queue: LabelQueue =
            DecreaseQueue::with_capacity(latest_first as OrderFn, stop_count);
        for (idx, label) in labels.iter().enumerate() {
            queue.insert(idx, label.departure)?;
        }

        let mut fixed = vec![false; stop_count];
        fixed[destination] = true;

        Ok(Self {
            labels,
            fixed,
            fixed_order: vec![destination],
            queue,
            cutoff: query.earliest_departure,
            stats: TraversalStats::default(),
        })
    }

    fn fix(&mut self, node: usize) {
        if !self.fixed[node] {
            self.fixed[node] = true;
            self.fixed_order.push(node);
        }
    }

    /// Offer `departure` as a new label for `src`. Returns whether it was taken.
    fn improve(
        &mut self,
        src: usize,
        departure: ServiceTime,
        predecessor: &StopId,
        via: Via,
    ) -> Result<bool, QueueError> {
        if self.fixed[src] || departure < self.cutoff {
            return Ok(false);
        }
        if !self.queue.decrease(&src, Some(departure))? {
            return Ok(false);
        }
        let label = &mut self.labels[src];
        label.departure = Some(departure);
        label.predecessor = Some(predecessor.clone());
        label.via = Some(via);
        self.stats.improvements += 1;
        Ok(true)
    }
}

/// Everything one traversal run owns.
struct Run {
    stops: Vec<Stop>,
    index: HashMap<StopId, usize>,
    graph: BackwardGraph,
    state: LabelState,
}

impl Run {
    /// Relax all backward edges and transfers into a fixed stop.
    fn relax(&mut self, node: usize) -> Result<(), QueueError> {
        let Some(departure) = self.state.labels[node].departure else {
            return Ok(());
        };
        let node_id = &self.stops[node].id;

        if let Some(edges) = self.graph.in_edges.get(&node) {
            for edge in edges {
                if edge.arrival > departure {
                    continue;
                }
                self.state.improve(
                    edge.from,
                    edge.departure,
                    node_id,
                    Via::Trip(edge.trip_id.clone()),
                )?;
            }
        }

        if let Some(transfers) = self.graph.in_transfers.get(&node) {
            for transfer in transfers {
                let Some(walk_departure) = departure.checked_sub_secs(transfer.min_transfer_secs)
                else {
                    continue;
                };
                self.state
                    .improve(transfer.from, walk_departure, node_id, Via::Transfer)?;
            }
        }

        Ok(())
    }

    /// Relax again from every fixed stop, in the order they were fixed.
    fn relax_fixed(&mut self) -> Result<(), QueueError> {
        for i in 0..self.state.fixed_order.len() {
            let node = self.state.fixed_order[i];
            self.relax(node)?;
        }
        Ok(())
    }

    fn into_reach_map(self, destination: usize, query: &Query) -> ReachMap {
        let finalized = self
            .state
            .fixed_order
            .iter()
            .map(|&idx| self.stops[idx].id.clone())
            .collect();
        let destination = self.stops[destination].id.clone();
        let stops = self
            .stops
            .into_iter()
            .zip(self.state.labels)
            .map(|(stop, label)| (stop.id.clone(), StopLabel { stop, label }))
            .collect();

        ReachMap {
            destination,
            target: query.target,
            earliest_departure: query.earliest_departure,
            stops,
            finalized,
            stats: self.state.stats,
        }
    }
}

/// Latest-departure traversal over an injected schedule store.
pub struct Traversal<'a, S: ScheduleStore> {
    store: &'a S,
    config: &'a TraversalConfig,
}

impl<'a, S: ScheduleStore> Traversal<'a, S> {
    /// Create a new traversal.
    pub fn new(store: &'a S, config: &'a TraversalConfig) -> Self {
        Self { store, config }
    }

    /// Compute the latest departure from every stop to the query's destination.
    ///
    /// Fails without computing anything if the destination is unknown. Any
    /// store failure aborts the query; no partial mapping is returned.
    pub async fn run(&self, query: &Query) -> Result<ReachMap, TraversalError> {
        query.validate()?;
        let increment = self.config.window_increment_secs;
        if increment == 0 {
            return Err(TraversalError::InvalidQuery(
                "window increment must be positive".to_string(),
            ));
        }

        let stops = dedup_stops(self.bounded("list_stops", self.store.list_stops()).await?);
        let index: HashMap<StopId, usize> = stops
            .iter()
            .enumerate()
            .map(|(idx, stop)| (stop.id.clone(), idx))
            .collect();
        let destination = resolve_destination(&stops, &index, &query.destination)?;

        let state = LabelState::new(stops.len(), destination, query)?;
        let mut run = Run {
            stops,
            index,
            graph: BackwardGraph::default(),
            state,
        };

        let cutoff = query.earliest_departure;
        let mut window = Window::initial(query.target, cutoff, increment);
        self.load_window(&mut run, query.date, window).await?;

        let transfers = self
            .bounded("all_transfers", self.store.all_transfers())
            .await?;
        run.graph.load_transfers(transfers, &run.index);

        debug!(
            destination = %run.stops[destination].id,
            stops = run.stops.len(),
            target = %query.target,
            cutoff = %cutoff,
            "starting traversal"
        );

        while !run.state.queue.is_empty() && window.ub > cutoff {
            let Some((&node, &departure)) = run.state.queue.peek() else {
                break;
            };

            match departure {
                Some(departure) if departure >= window.lb => {
                    run.state.queue.extract_min();
                    run.state.fix(node);
                    run.state.stats.stops_fixed += 1;
                    trace!(stop = %run.stops[node].id, %departure, "fixed");
                    run.relax(node)?;
                }
                _ => {
                    // Nothing left to fix with the loaded legs; reveal earlier ones.
                    window.slide(cutoff, increment);
                    self.load_window(&mut run, query.date, window).await?;
                    run.relax_fixed()?;
                }
            }
        }

        debug!(
            fixed = run.state.fixed_order.len(),
            window_loads = run.state.stats.window_loads,
            improvements = run.state.stats.improvements,
            "traversal done"
        );

        Ok(run.into_reach_map(destination, query))
    }

    async fn load_window(
        &self,
        run: &mut Run,
        date: NaiveDate,
        window: Window,
    ) -> Result<(), ScheduleError> {
        let edges = self
            .bounded(
                "edges_in_window",
                self.store.edges_in_window(date, window.lb, window.ub),
            )
            .await?;
        debug!(lb = %window.lb, ub = %window.ub, edges = edges.len(), "loaded window");

        run.state.stats.window_loads += 1;
        run.state.stats.edges_loaded += edges.len();
        run.graph.load_edges(edges, &run.index);
        Ok(())
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, ScheduleError>>,
    ) -> Result<T, ScheduleError> {
        let after = self.config.store_timeout();
        match tokio::time::timeout(after, call).await {
            Ok(result) => result,
            Err(_) => Err(ScheduleError::Timeout { operation, after }),
        }
    }
}

/// Keep the first occurrence of each stop id.
fn dedup_stops(stops: Vec<Stop>) -> Vec<Stop> {
    let mut seen = std::collections::HashSet::with_capacity(stops.len());
    let total = stops.len();
    let unique: Vec<Stop> = stops
        .into_iter()
        .filter(|stop| seen.insert(stop.id.clone()))
        .collect();
    if unique.len() < total {
        warn!(duplicates = total - unique.len(), "schedule lists duplicate stop ids");
    }
    unique
}

fn resolve_destination(
    stops: &[Stop],
    index: &HashMap<StopId, usize>,
    destination: &Destination,
) -> Result<usize, TraversalError> {
    let found = match destination {
        Destination::Name(name) => stops.iter().position(|stop| &stop.name == name),
        Destination::Id(id) => index.get(id).copied(),
    };
    found.ok_or_else(|| TraversalError::UnknownDestination(destination.to_string()))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
