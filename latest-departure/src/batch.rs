//! Weighted batches of independent queries.
//!
//! A batch models a recurring commute pattern: several destinations and
//! times, each with a weight (how often the trip is made). Every query runs
//! its own traversal against one shared store; the results can then be
//! folded into a per-stop commute total.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{debug, info};

use crate::domain::StopId;
use crate::schedule::ScheduleStore;
use crate::traversal::{Query, ReachMap, Traversal, TraversalConfig, TraversalError};

/// Queries run concurrently per chunk.
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// A query together with how many times it counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedQuery {
    pub query: Query,
    pub weight: u32,
}

impl WeightedQuery {
    pub fn new(query: Query, weight: u32) -> Self {
        Self { query, weight }
    }
}

/// Outcome of one weighted query.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub weight: u32,
    pub map: ReachMap,
}

/// Run every query with a positive weight, `batch_size` at a time.
///
/// Queries are independent: each owns its labels, queue and window. The
/// first failing query fails the batch.
pub async fn run_batch<S: ScheduleStore>(
    store: &S,
    config: &TraversalConfig,
    queries: &[WeightedQuery],
    batch_size: usize,
) -> Result<Vec<BatchResult>, TraversalError> {
    let active: Vec<&WeightedQuery> = queries.iter().filter(|q| q.weight > 0).collect();
    if active.is_empty() {
        return Ok(Vec::new());
    }

    let mut results = Vec::with_capacity(active.len());

    for chunk in active.chunks(batch_size.max(1)) {
        let futures: Vec<_> = chunk
            .iter()
            .map(|weighted| async move {
                debug!(
                    destination = %weighted.query.destination,
                    date = %weighted.query.date,
                    target = %weighted.query.target,
                    weight = weighted.weight,
                    "running batch query"
                );
                let map = Traversal::new(store, config).run(&weighted.query).await?;
                Ok::<_, TraversalError>(BatchResult {
                    weight: weighted.weight,
                    map,
                })
            })
            .collect();

        for result in join_all(futures).await {
            results.push(result?);
        }
    }

    info!(queries = results.len(), "batch complete");
    Ok(results)
}

/// Weighted commute minutes per stop: `weight * (target - latest departure)`.
///
/// A stop that cannot reach the destination of some query has no finite
/// total and is left out.
pub fn commute_totals(results: &[BatchResult]) -> BTreeMap<StopId, f64> {
    let Some(first) = results.first() else {
        return BTreeMap::new();
    };

    let mut totals: BTreeMap<StopId, f64> = first
        .map
        .stops
        .keys()
        .map(|id| (id.clone(), 0.0))
        .collect();

    for result in results {
        totals.retain(|id, total| match result.map.departure(id) {
            Some(departure) => {
                let minutes = result.map.target.signed_secs_since(departure) as f64 / 60.0;
                *total += f64::from(result.weight) * minutes;
                true
            }
            None => false,
        });
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Edge, ServiceCalendar, ServiceTime, Stop, TripId};
    use crate::schedule::InMemorySchedule;
    use crate::traversal::Destination;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn id(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse_hhmm(s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 9, 18).unwrap()
    }

    /// A <- B <- C line, plus Z which is never reachable.
    fn schedule() -> InMemorySchedule {
        let mut schedule = InMemorySchedule::new();
        for s in ["A", "B", "C", "Z"] {
            schedule.add_stop(Stop::new(id(s), format!("Stop {s}"), 47.0, 8.0));
        }
        let calendar = Arc::new(ServiceCalendar::daily(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        ));
        schedule.add_edge(
            Edge::new(id("B"), id("A"), t("08:00"), t("08:10"), TripId::new("T1")),
            calendar.clone(),
        );
        schedule.add_edge(
            Edge::new(id("C"), id("B"), t("07:30"), t("07:50"), TripId::new("T2")),
            calendar.clone(),
        );
        schedule.add_edge(
            Edge::new(id("A"), id("B"), t("17:00"), t("17:10"), TripId::new("T3")),
            calendar,
        );
        schedule
    }

    fn query(destination: &str, target: &str, weight: u32) -> WeightedQuery {
        WeightedQuery::new(
            Query::new(Destination::Name(format!("Stop {destination}")), date(), t(target)),
            weight,
        )
    }

    #[tokio::test]
    async fn runs_positive_weights_only() {
        let store = schedule();
        let config = TraversalConfig::default();
        let queries = vec![
            query("A", "08:30", 5),
            query("B", "17:30", 0),
            query("B", "18:00", 2),
        ];

        let results = run_batch(&store, &config, &queries, 1).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].weight, 5);
        assert_eq!(results[0].map.destination, id("A"));
        assert_eq!(results[1].map.destination, id("B"));
        assert_eq!(results[1].map.departure(&id("A")), Some(t("17:00")));
    }

    #[tokio::test]
    async fn failing_query_fails_batch() {
        let store = schedule();
        let config = TraversalConfig::default();
        let queries = vec![query("A", "08:30", 1), query("Nowhere", "08:30", 1)];

        let err = run_batch(&store, &config, &queries, DEFAULT_BATCH_SIZE)
            .await
            .unwrap_err();

        assert!(matches!(err, TraversalError::UnknownDestination(_)));
    }

    #[tokio::test]
    async fn empty_batch() {
        let store = schedule();
        let config = TraversalConfig::default();

        let results = run_batch(&store, &config, &[], DEFAULT_BATCH_SIZE)
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(commute_totals(&results).is_empty());
    }

    #[tokio::test]
    async fn totals_weight_each_query() {
        let store = schedule();
        let config = TraversalConfig::default();
        let queries = vec![query("A", "08:30", 5), query("B", "18:00", 2)];

        let results = run_batch(&store, &config, &queries, DEFAULT_BATCH_SIZE)
            .await
            .unwrap();
        let totals = commute_totals(&results);

        // A: 5 * 0 + 2 * (18:00 - 17:00)
        assert_eq!(totals.get(&id("A")), Some(&120.0));
        // B: 5 * (08:30 - 08:00) + 2 * 0
        assert_eq!(totals.get(&id("B")), Some(&150.0));
        // C: 5 * (08:30 - 07:30) + 2 * (18:00 - 07:30)
        assert_eq!(totals.get(&id("C")), Some(&(300.0 + 2.0 * 630.0)));
        assert_eq!(totals.get(&id("Z")), None);
    }
}
