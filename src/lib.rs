//! Refresh-coordinated market data cache library.

pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod scheduler;
pub mod sources;

pub use cache::{CacheRead, CacheStatus, RefreshCache, RefreshOutcome, SnapshotSource};
pub use config::AppConfig;
pub use lifecycle::{Runtime, Shutdown};
