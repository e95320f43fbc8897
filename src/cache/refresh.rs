//! Refresh-coordinated cache.
//!
//! # Responsibilities
//! - Own the snapshot and publish a new one after every refresh cycle
//! - Guarantee at most one refresh in flight (single-flight)
//! - Fetch each sub-resource behind its own failure boundary
//! - Drive periodic refreshes through the no-pileup interval scheduler
//! - Serve non-blocking reads of the current snapshot
//!
//! # Design Decisions
//! - `is_refreshing` is an atomic claimed with compare-exchange and released by
//!   a guard, so a panic mid-refresh cannot leave it stuck
//! - The snapshot lives in an `ArcSwap`; readers get an `Arc` without locking
//! - Failures keep the previous value of the failed sub-resource; they never
//!   erase good data
//! - `last_updated` advances once per completed cycle and never goes backwards
//! - `stop()` disarms the schedule; an in-flight refresh runs to completion

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::snapshot::{CacheRead, Snapshot};
use crate::cache::source::SnapshotSource;
use crate::cache::status::{CacheStatus, RefreshOutcome, RefreshReport};
use crate::config::{CacheConfig, RetryConfig};
use crate::observability::{metrics, LoggingRetryObserver, LoggingTaskObserver};
use crate::resilience::{retry_with_timeout, RetryPolicy};
use crate::scheduler::{spawn_interval, Clock, ScheduledTask, SchedulerError, SharedObserver, SystemClock};

type SnapshotOf<S> = Snapshot<<S as SnapshotSource>::Record, <S as SnapshotSource>::Aggregate>;

/// Tunables for a [`RefreshCache`].
pub struct CacheOptions<E> {
    /// Period of the scheduled refresh.
    pub refresh_interval: Duration,
    /// Bound on each individual fetch attempt.
    pub fetch_timeout: Duration,
    /// Retry policy for every fetch. A logging observer is attached per
    /// sub-resource unless the policy already carries one.
    pub retry: RetryPolicy<E>,
    pub clock: Arc<dyn Clock>,
    pub task_observer: SharedObserver,
}

impl<E: Error + 'static> CacheOptions<E> {
    pub fn from_config(cache: &CacheConfig, retry: &RetryConfig) -> Self {
        Self {
            refresh_interval: Duration::from_secs(cache.refresh_interval_secs),
            fetch_timeout: Duration::from_millis(cache.fetch_timeout_ms),
            retry: RetryPolicy::from_config(retry),
            clock: Arc::new(SystemClock),
            task_observer: Arc::new(LoggingTaskObserver),
        }
    }
}

impl<E: Error + 'static> Default for CacheOptions<E> {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default(), &RetryConfig::default())
    }
}

/// Holds `is_refreshing` for the duration of one cycle.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A cache of records and an aggregate, refreshed from a [`SnapshotSource`].
pub struct RefreshCache<S: SnapshotSource> {
    name: String,
    source: Arc<S>,
    ids: Vec<String>,
    refresh_interval: Duration,
    fetch_timeout: Duration,
    records_policy: RetryPolicy<S::Error>,
    aggregate_policy: RetryPolicy<S::Error>,
    clock: Arc<dyn Clock>,
    task_observer: SharedObserver,
    snapshot: ArcSwap<SnapshotOf<S>>,
    refreshing: AtomicBool,
    initialized: AtomicBool,
    schedule: Mutex<Option<ScheduledTask>>,
}

impl<S: SnapshotSource> RefreshCache<S> {
    pub fn new(
        name: impl Into<String>,
        source: Arc<S>,
        ids: Vec<String>,
        options: CacheOptions<S::Error>,
    ) -> Arc<Self> {
        let name = name.into();
        let policy_for = |resource: &str| {
            if options.retry.has_observer() {
                options.retry.clone()
            } else {
                options
                    .retry
                    .clone()
                    .observe(Arc::new(LoggingRetryObserver::new(format!("{}.{}", name, resource))))
            }
        };
        let records_policy = policy_for("records");
        let aggregate_policy = policy_for("aggregate");

        Arc::new(Self {
            name,
            source,
            ids,
            refresh_interval: options.refresh_interval,
            fetch_timeout: options.fetch_timeout,
            records_policy,
            aggregate_policy,
            clock: options.clock,
            task_observer: options.task_observer,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            refreshing: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            schedule: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    // --- Lifecycle ---

    /// Refresh once, mark the cache initialized, then arm the periodic refresh.
    ///
    /// Calling `start` on a cache that is already scheduled does nothing.
    pub async fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        if self.lock_schedule().is_some() {
            tracing::warn!(cache = %self.name, "Cache already started");
            return Ok(());
        }

        tracing::info!(
            cache = %self.name,
            ids = self.ids.len(),
            interval_secs = self.refresh_interval.as_secs(),
            "Starting cache"
        );

        self.refresh_cache().await;
        self.initialized.store(true, Ordering::Release);

        let cache = Arc::downgrade(self);
        let task = spawn_interval(
            format!("{}-refresh", self.name),
            self.refresh_interval,
            self.task_observer.clone(),
            move || {
                let cache = cache.clone();
                async move {
                    if let Some(cache) = cache.upgrade() {
                        cache.refresh_cache().await;
                    }
                }
            },
        )?;

        let mut schedule = self.lock_schedule();
        if schedule.is_some() {
            // A concurrent start won the race; keep its schedule.
            task.stop();
        } else {
            *schedule = Some(task);
        }
        Ok(())
    }

    /// Disarm the periodic refresh. An in-flight refresh is not cancelled.
    pub fn stop(&self) {
        if let Some(task) = self.lock_schedule().take() {
            task.stop();
            tracing::info!(cache = %self.name, "Cache refresh schedule stopped");
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.lock_schedule().is_some()
    }

    // --- Refresh ---

    /// Run one refresh cycle unless another is already in flight.
    ///
    /// Never fails: every fetch error is logged and isolated to its
    /// sub-resource.
    pub async fn refresh_cache(&self) -> RefreshOutcome {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            tracing::info!(cache = %self.name, "Refresh already in progress, skipping");
            metrics::record_refresh(&self.name, "skipped");
            return RefreshOutcome::Skipped;
        };

        let span = tracing::info_span!("cache_refresh", cache = %self.name, cycle_id = %Uuid::new_v4());
        self.run_cycle().instrument(span).await
    }

    /// Manual trigger sharing the single-flight path of scheduled refreshes.
    pub async fn force_refresh(&self) -> RefreshOutcome {
        tracing::info!(cache = %self.name, "Manual refresh requested");
        self.refresh_cache().await
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        let started = Instant::now();

        let (records, aggregate) = tokio::join!(self.fetch_records(), self.fetch_aggregate());

        let previous = self.snapshot.load_full();
        let now = self.clock.now();
        let updated_at = previous.last_updated.map_or(now, |prev| prev.max(now));

        let mut next: SnapshotOf<S> = (*previous).clone();
        let records_updated = match records {
            Some(fetched) => {
                next.records = fetched;
                next.records_fetched_at = Some(updated_at);
                true
            }
            None => false,
        };
        let aggregate_updated = match aggregate {
            Some(fetched) => {
                next.aggregate = Some(fetched);
                next.aggregate_fetched_at = Some(updated_at);
                true
            }
            None => false,
        };
        next.last_updated = Some(updated_at);

        let record_count = next.records.len();
        self.snapshot.store(Arc::new(next));

        let report = RefreshReport {
            records_updated,
            aggregate_updated,
            record_count,
            last_updated: updated_at,
            elapsed: started.elapsed(),
        };

        metrics::record_refresh(&self.name, report.outcome_label());
        metrics::record_refresh_duration(&self.name, report.elapsed);
        metrics::record_cache_size(&self.name, record_count);
        tracing::info!(
            outcome = report.outcome_label(),
            records = record_count,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Refresh cycle complete"
        );

        RefreshOutcome::Completed(report)
    }

    async fn fetch_records(&self) -> Option<HashMap<String, S::Record>> {
        let result = retry_with_timeout(&self.records_policy, self.fetch_timeout, || {
            self.source.fetch_records(&self.ids)
        })
        .await;

        match result {
            Ok(records) => {
                tracing::debug!(count = records.len(), "Fetched records");
                Some(records)
            }
            Err(e) => {
                tracing::warn!(resource = "records", error = %e, "Fetch failed, keeping previous value");
                metrics::record_fetch_failure(&self.name, "records");
                None
            }
        }
    }

    async fn fetch_aggregate(&self) -> Option<S::Aggregate> {
        let result = retry_with_timeout(&self.aggregate_policy, self.fetch_timeout, || {
            self.source.fetch_aggregate()
        })
        .await;

        match result {
            Ok(aggregate) => Some(aggregate),
            Err(e) => {
                tracing::warn!(resource = "aggregate", error = %e, "Fetch failed, keeping previous value");
                metrics::record_fetch_failure(&self.name, "aggregate");
                None
            }
        }
    }

    // --- Reads ---

    /// The current snapshot. Never blocks on a refresh.
    pub fn snapshot(&self) -> Arc<SnapshotOf<S>> {
        self.snapshot.load_full()
    }

    pub fn get_records(&self) -> CacheRead<HashMap<String, S::Record>> {
        let snapshot = self.snapshot.load();
        match snapshot.records_fetched_at {
            Some(_) => CacheRead::Ready(snapshot.records.clone()),
            None => CacheRead::Pending,
        }
    }

    pub fn get_record(&self, id: &str) -> CacheRead<Option<S::Record>> {
        let snapshot = self.snapshot.load();
        match snapshot.records_fetched_at {
            Some(_) => CacheRead::Ready(snapshot.records.get(id).cloned()),
            None => CacheRead::Pending,
        }
    }

    pub fn get_aggregate(&self) -> CacheRead<S::Aggregate> {
        match &self.snapshot.load().aggregate {
            Some(aggregate) => CacheRead::Ready(aggregate.clone()),
            None => CacheRead::Pending,
        }
    }

    pub fn get_cache_status(&self) -> CacheStatus {
        let snapshot = self.snapshot.load();
        CacheStatus {
            name: self.name.clone(),
            last_updated: snapshot.last_updated,
            is_refreshing: self.is_refreshing(),
            record_count: snapshot.records.len(),
            has_aggregate: snapshot.aggregate.is_some(),
            cache_age_ms: snapshot
                .age_at(self.clock.now())
                .map(|age| age.as_millis() as u64),
            initialized: self.is_initialized(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.snapshot.load().has_data()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn lock_schedule(&self) -> MutexGuard<'_, Option<ScheduledTask>> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: SnapshotSource> fmt::Debug for RefreshCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCache")
            .field("name", &self.name)
            .field("ids", &self.ids)
            .field("refresh_interval", &self.refresh_interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("is_refreshing", &self.is_refreshing())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
