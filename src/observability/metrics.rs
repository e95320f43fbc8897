//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define cache, retry and scheduler metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `cache_refresh_total` (counter): refresh cycles by cache, outcome
//! - `cache_refresh_duration_seconds` (histogram): cycle latency
//! - `cache_fetch_failures_total` (counter): failed sub-resource fetches
//! - `cache_records` (gauge): records held per cache
//! - `retry_attempts_total` (counter): scheduled retries per operation
//! - `scheduler_runs_total` (counter): task invocations
//! - `scheduler_failed_runs_total` (counter): invocations that panicked
//! - `scheduler_skipped_ticks_total` (counter): ticks dropped to avoid pileup
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without an installed recorder every call is a no-op
//! - The recorder is installed once, by the runtime container at startup

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime, at most once per process.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_refresh(cache: &str, outcome: &'static str) {
    counter!("cache_refresh_total", "cache" => cache.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_refresh_duration(cache: &str, elapsed: Duration) {
    histogram!("cache_refresh_duration_seconds", "cache" => cache.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_fetch_failure(cache: &str, resource: &'static str) {
    counter!("cache_fetch_failures_total", "cache" => cache.to_string(), "resource" => resource)
        .increment(1);
}

pub fn record_cache_size(cache: &str, records: usize) {
    gauge!("cache_records", "cache" => cache.to_string()).set(records as f64);
}

pub fn record_retry(operation: &str) {
    counter!("retry_attempts_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_task_run(task: &str) {
    counter!("scheduler_runs_total", "task" => task.to_string()).increment(1);
}

pub fn record_task_failure(task: &str) {
    counter!("scheduler_failed_runs_total", "task" => task.to_string()).increment(1);
}

pub fn record_skipped_tick(task: &str) {
    counter!("scheduler_skipped_ticks_total", "task" => task.to_string()).increment(1);
}
