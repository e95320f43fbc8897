//! Scheduled task handles and observation hooks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Errors raised when arming a schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("UTC hour must be within 0..=23, got {0}")]
    InvalidHour(u32),

    #[error("interval must be greater than zero")]
    ZeroInterval,
}

/// What makes a scheduled task fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every `Duration`, skipping ticks that overlap a running invocation.
    Interval(Duration),
    /// Once per day at `hour:00` UTC.
    DailyAtUtc { hour: u32 },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval(every) => write!(f, "every {}ms", every.as_millis()),
            Trigger::DailyAtUtc { hour } => write!(f, "daily at {:02}:00 UTC", hour),
        }
    }
}

/// Receives scheduler lifecycle events. All methods default to no-ops.
pub trait TaskObserver: Send + Sync {
    fn on_run_start(&self, _task: &str) {}

    fn on_run_complete(&self, _task: &str, _elapsed: Duration) {}

    /// The invocation panicked. The schedule keeps going.
    fn on_run_failed(&self, _task: &str) {}

    /// A tick fired while the previous invocation was still running.
    fn on_skip(&self, _task: &str) {}

    fn on_stopped(&self, _task: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TaskObserver for NoopObserver {}

pub type SharedObserver = Arc<dyn TaskObserver>;

/// Handle to a running schedule.
///
/// Dropping the handle stops the schedule as well.
pub struct ScheduledTask {
    name: String,
    trigger: Trigger,
    stop_tx: watch::Sender<bool>,
    driver: JoinHandle<()>,
}

impl ScheduledTask {
    pub(crate) fn new(
        name: String,
        trigger: Trigger,
        stop_tx: watch::Sender<bool>,
        driver: JoinHandle<()>,
    ) -> Self {
        Self {
            name,
            trigger,
            stop_tx,
            driver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Prevent all future invocations. Idempotent.
    ///
    /// An invocation already running is left to finish.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow() || self.driver.is_finished()
    }

    /// Wait for the driving loop to exit after [`ScheduledTask::stop`].
    pub async fn join(self) {
        self.stop();
        let _ = self.driver.await;
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Resolves once `stop_rx` flips to `true` or its sender is gone.
pub(crate) async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    while !*stop_rx.borrow_and_update() {
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}
