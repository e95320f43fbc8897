//! Cache status report and refresh outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Point-in-time view of a cache's health, for status and health endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub name: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_refreshing: bool,
    pub record_count: usize,
    pub has_aggregate: bool,
    /// `now - last_updated`, derived at read time.
    pub cache_age_ms: Option<u64>,
    /// The initial refresh in `start()` has completed.
    pub initialized: bool,
}

impl CacheStatus {
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_age_ms.map(Duration::from_millis)
    }

    /// Whether the snapshot is older than `max_age` (or was never filled).
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.cache_age().map_or(true, |age| age > max_age)
    }
}

/// What one call to `refresh_cache` did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Another refresh was already running; nothing was fetched.
    Skipped,
    /// A cycle ran to completion, possibly with isolated failures.
    Completed(RefreshReport),
}

impl RefreshOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RefreshOutcome::Skipped)
    }

    pub fn report(&self) -> Option<&RefreshReport> {
        match self {
            RefreshOutcome::Completed(report) => Some(report),
            RefreshOutcome::Skipped => None,
        }
    }
}

/// Per-cycle summary.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub records_updated: bool,
    pub aggregate_updated: bool,
    pub record_count: usize,
    pub last_updated: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RefreshReport {
    /// Metric label for this cycle.
    pub fn outcome_label(&self) -> &'static str {
        match (self.records_updated, self.aggregate_updated) {
            (true, true) => "success",
            (false, false) => "failed",
            _ => "partial",
        }
    }
}
