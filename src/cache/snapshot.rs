//! Snapshot state and read results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// The complete cached state at one point in time.
///
/// Snapshots are immutable once published; a refresh builds a new one and
/// swaps it in.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<R, A> {
    /// Records keyed by identifier.
    pub records: HashMap<String, R>,
    /// When `records` last received a successful fetch.
    pub records_fetched_at: Option<DateTime<Utc>>,
    /// Source-wide aggregate, once fetched.
    pub aggregate: Option<A>,
    pub aggregate_fetched_at: Option<DateTime<Utc>>,
    /// End of the most recent completed refresh cycle. Never decreases.
    pub last_updated: Option<DateTime<Utc>>,
}

impl<R, A> Default for Snapshot<R, A> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            records_fetched_at: None,
            aggregate: None,
            aggregate_fetched_at: None,
            last_updated: None,
        }
    }
}

impl<R, A> Snapshot<R, A> {
    /// Whether any sub-resource holds data.
    pub fn has_data(&self) -> bool {
        !self.records.is_empty() || self.aggregate.is_some()
    }

    /// Time elapsed between `last_updated` and `now`.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_updated
            .map(|updated| (now - updated).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Result of reading a sub-resource.
///
/// `Pending` means the sub-resource has never been fetched successfully,
/// which is different from `Ready` holding an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum CacheRead<T> {
    Pending,
    Ready(T),
}

impl<T> CacheRead<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, CacheRead::Pending)
    }

    pub fn ready(self) -> Option<T> {
        match self {
            CacheRead::Ready(value) => Some(value),
            CacheRead::Pending => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheRead<U> {
        match self {
            CacheRead::Ready(value) => CacheRead::Ready(f(value)),
            CacheRead::Pending => CacheRead::Pending,
        }
    }
}
