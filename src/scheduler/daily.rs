//! Daily-at-UTC-hour scheduler.
//!
//! # Responsibilities
//! - Compute the next `H:00 UTC` strictly after "now"
//! - Arm one timer for exactly that offset, run, then recompute and rearm
//!
//! # Design Decisions
//! - The absolute target is recomputed from the clock every cycle instead of
//!   chaining 24h sleeps, so timer imprecision never accumulates
//! - Runs execute on their own Tokio task and are awaited; a panicking run
//!   does not end the schedule, and successive runs never overlap

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::scheduler::clock::Clock;
use crate::scheduler::task::{stopped, ScheduledTask, SchedulerError, SharedObserver, Trigger};

/// The next `hour:00:00 UTC` strictly after `now`.
pub fn next_occurrence(now: DateTime<Utc>, hour: u32) -> Result<DateTime<Utc>, SchedulerError> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .ok_or(SchedulerError::InvalidHour(hour))?
        .and_utc();

    if today > now {
        Ok(today)
    } else {
        Ok(today + chrono::Duration::days(1))
    }
}

/// Start calling `task` once a day at `hour:00` UTC as read from `clock`.
pub fn spawn_daily_at_utc<F, Fut>(
    name: impl Into<String>,
    hour: u32,
    clock: Arc<dyn Clock>,
    observer: SharedObserver,
    task: F,
) -> Result<ScheduledTask, SchedulerError>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // Validates the hour before anything is spawned.
    next_occurrence(clock.now(), hour)?;

    let name = name.into();
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let loop_name = name.clone();
    let driver = tokio::spawn(async move {
        loop {
            let now = clock.now();
            let Ok(target) = next_occurrence(now, hour) else {
                break;
            };
            let delay = (target - now).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                biased;
                _ = stopped(&mut stop_rx) => break,
                _ = time::sleep(delay) => {}
            }

            observer.on_run_start(&loop_name);
            let started = Instant::now();
            match tokio::spawn(task()).await {
                Ok(()) => observer.on_run_complete(&loop_name, started.elapsed()),
                Err(_) => observer.on_run_failed(&loop_name),
            }
        }

        observer.on_stopped(&loop_name);
    });

    Ok(ScheduledTask::new(name, Trigger::DailyAtUtc { hour }, stop_tx, driver))
}
