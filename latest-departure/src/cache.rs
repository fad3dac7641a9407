//! Caching layer for schedule stores.
//!
//! Window loads are keyed by the exact `(date, start, end)` triple, so a
//! batch of queries with the same target time and window increment shares
//! every load after the first. Stops and transfers do not depend on the
//! query and are cached as single entries.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache as MokaCache;
use tracing::trace;

use crate::domain::{Edge, ServiceTime, Stop, Transfer};
use crate::schedule::{ScheduleError, ScheduleStore};

/// Cache key for window loads: (service date, start secs, end secs).
type WindowKey = (NaiveDate, u32, u32);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached windows.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_capacity: 1000,
        }
    }
}

/// Schedule store with caching.
///
/// Wraps any [`ScheduleStore`]; failed loads are not cached.
pub struct CachedSchedule<S> {
    store: S,
    windows: MokaCache<WindowKey, Arc<Vec<Edge>>>,
    stops: MokaCache<(), Arc<Vec<Stop>>>,
    transfers: MokaCache<(), Arc<Vec<Transfer>>>,
}

impl<S: ScheduleStore> CachedSchedule<S> {
    /// Create a new cached store.
    pub fn new(store: S, config: &CacheConfig) -> Self {
        let windows = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        let stops = MokaCache::builder().time_to_live(config.ttl).build();
        let transfers = MokaCache::builder().time_to_live(config.ttl).build();

        Self {
            store,
            windows,
            stops,
            transfers,
        }
    }

    /// Access the underlying store for operations that bypass cache.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Number of cached windows.
    pub async fn window_count(&self) -> u64 {
        self.windows.run_pending_tasks().await;
        self.windows.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.windows.invalidate_all();
        self.stops.invalidate_all();
        self.transfers.invalidate_all();
    }
}

impl<S: ScheduleStore + Sync> ScheduleStore for CachedSchedule<S> {
    async fn list_stops(&self) -> Result<Vec<Stop>, ScheduleError> {
        if let Some(cached) = self.stops.get(&()).await {
            return Ok(cached.as_ref().clone());
        }

        let stops = Arc::new(self.store.list_stops().await?);
        self.stops.insert((), stops.clone()).await;
        Ok(stops.as_ref().clone())
    }

    async fn edges_in_window(
        &self,
        date: NaiveDate,
        start: ServiceTime,
        end: ServiceTime,
    ) -> Result<Vec<Edge>, ScheduleError> {
        let key = (date, start.seconds(), end.seconds());

        if let Some(cached) = self.windows.get(&key).await {
            trace!(%date, %start, %end, "window cache hit");
            return Ok(cached.as_ref().clone());
        }

        let edges = Arc::new(self.store.edges_in_window(date, start, end).await?);
        self.windows.insert(key, edges.clone()).await;
        Ok(edges.as_ref().clone())
    }

    async fn all_transfers(&self) -> Result<Vec<Transfer>, ScheduleError> {
        if let Some(cached) = self.transfers.get(&()).await {
            return Ok(cached.as_ref().clone());
        }

        let transfers = Arc::new(self.store.all_transfers().await?);
        self.transfers.insert((), transfers.clone()).await;
        Ok(transfers.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ServiceCalendar, StopId, TripId};
    use crate::schedule::InMemorySchedule;
    use std::sync::Mutex;

    /// Store that counts calls and can be told to fail.
    struct CountingStore {
        inner: InMemorySchedule,
        calls: Mutex<usize>,
        fail: Mutex<bool>,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn record(&self) -> Result<(), ScheduleError> {
            *self.calls.lock().unwrap() += 1;
            if *self.fail.lock().unwrap() {
                Err(ScheduleError::Connection("down".into()))
            } else {
                Ok(())
            }
        }
    }

    impl ScheduleStore for CountingStore {
        async fn list_stops(&self) -> Result<Vec<Stop>, ScheduleError> {
            self.record()?;
            self.inner.list_stops().await
        }

        async fn edges_in_window(
            &self,
            date: NaiveDate,
            start: ServiceTime,
            end: ServiceTime,
        ) -> Result<Vec<Edge>, ScheduleError> {
            self.record()?;
            self.inner.edges_in_window(date, start, end).await
        }

        async fn all_transfers(&self) -> Result<Vec<Transfer>, ScheduleError> {
            self.record()?;
            self.inner.all_transfers().await
        }
    }

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse_hhmm(s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 9, 18).unwrap()
    }

    fn counting_store() -> CountingStore {
        let mut inner = InMemorySchedule::new();
        let a = StopId::parse("A").unwrap();
        let b = StopId::parse("B").unwrap();
        inner.add_stop(Stop::new(a.clone(), "Alpha", 47.0, 8.0));
        inner.add_stop(Stop::new(b.clone(), "Beta", 47.1, 8.1));
        let calendar = Arc::new(ServiceCalendar::daily(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        ));
        inner.add_edge(
            Edge::new(b, a, t("08:00"), t("08:10"), TripId::new("T1")),
            calendar,
        );
        CountingStore {
            inner,
            calls: Mutex::new(0),
            fail: Mutex::new(false),
        }
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.max_capacity, 1000);
    }

    #[tokio::test]
    async fn repeated_window_hits_cache() {
        let cached = CachedSchedule::new(counting_store(), &CacheConfig::default());

        let first = cached
            .edges_in_window(date(), t("07:30"), t("08:30"))
            .await
            .unwrap();
        let second = cached
            .edges_in_window(date(), t("07:30"), t("08:30"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(cached.inner().calls(), 1);
        assert_eq!(cached.window_count().await, 1);
    }

    #[tokio::test]
    async fn different_windows_are_distinct_entries() {
        let cached = CachedSchedule::new(counting_store(), &CacheConfig::default());

        cached
            .edges_in_window(date(), t("07:30"), t("08:30"))
            .await
            .unwrap();
        let earlier = cached
            .edges_in_window(date(), t("06:30"), t("07:30"))
            .await
            .unwrap();

        assert!(earlier.is_empty());
        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn reference_data_loaded_once() {
        let cached = CachedSchedule::new(counting_store(), &CacheConfig::default());

        for _ in 0..3 {
            assert_eq!(cached.list_stops().await.unwrap().len(), 2);
            assert!(cached.all_transfers().await.unwrap().is_empty());
        }

        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cached = CachedSchedule::new(counting_store(), &CacheConfig::default());
        *cached.inner().fail.lock().unwrap() = true;

        assert!(cached.list_stops().await.is_err());

        *cached.inner().fail.lock().unwrap() = false;
        assert_eq!(cached.list_stops().await.unwrap().len(), 2);
        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cached = CachedSchedule::new(counting_store(), &CacheConfig::default());

        cached.list_stops().await.unwrap();
        cached.invalidate_all();
        cached.list_stops().await.unwrap();

        assert_eq!(cached.inner().calls(), 2);
    }
}
