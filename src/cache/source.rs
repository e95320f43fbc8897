//! Fetch capability the cache is built around.

use async_trait::async_trait;
use std::collections::HashMap;

/// An external source that can produce the cache's sub-resources.
///
/// Implementations are treated as opaque, possibly slow and flaky async
/// operations; the cache wraps every call in its retry/timeout policy.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Per-identifier record.
    type Record: Clone + Send + Sync + 'static;

    /// Source-wide aggregate record.
    type Aggregate: Clone + Send + Sync + 'static;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch records for `ids`. A successful result replaces the cached map
    /// wholesale; identifiers missing from it are no longer served.
    async fn fetch_records(&self, ids: &[String]) -> Result<HashMap<String, Self::Record>, Self::Error>;

    async fn fetch_aggregate(&self) -> Result<Self::Aggregate, Self::Error>;
}
