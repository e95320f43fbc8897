//! Tracing + metrics implementations of the resilience and scheduler hooks.

use std::fmt::Display;
use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::{ResilienceError, RetryObserver};
use crate::scheduler::TaskObserver;

/// Logs and counts every scheduled retry of one named operation.
#[derive(Debug, Clone)]
pub struct LoggingRetryObserver {
    operation: String,
}

impl LoggingRetryObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

impl<E: Display> RetryObserver<E> for LoggingRetryObserver {
    fn on_retry(&self, attempt: u32, error: &ResilienceError<E>, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, retrying"
        );
        metrics::record_retry(&self.operation);
    }
}

/// Logs scheduler lifecycle events and counts runs, panics and skipped ticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTaskObserver;

impl TaskObserver for LoggingTaskObserver {
    fn on_run_start(&self, task: &str) {
        tracing::debug!(task, "Scheduled task starting");
        metrics::record_task_run(task);
    }

    fn on_run_complete(&self, task: &str, elapsed: Duration) {
        tracing::debug!(task, elapsed_ms = elapsed.as_millis() as u64, "Scheduled task finished");
    }

    fn on_run_failed(&self, task: &str) {
        tracing::error!(task, "Scheduled task panicked");
        metrics::record_task_failure(task);
    }

    fn on_skip(&self, task: &str) {
        tracing::info!(task, "Previous run still in progress, skipping tick");
        metrics::record_skipped_tick(task);
    }

    fn on_stopped(&self, task: &str) {
        tracing::info!(task, "Schedule stopped");
    }
}
