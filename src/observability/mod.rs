//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Core components emit events through explicit observers:
//!     resilience → RetryObserver  ─┐
//!     scheduler  → TaskObserver   ─┼→ observers.rs → logging.rs (structured log events)
//!     cache      → direct calls   ─┘               → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Every refresh cycle carries a cycle ID span field
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod observers;

pub use observers::{LoggingRetryObserver, LoggingTaskObserver};
