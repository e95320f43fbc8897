//! Fixed-interval scheduler that never piles up.
//!
//! # Responsibilities
//! - Tick every `interval`, first tick one full interval after start
//! - Run the task on a tick only if the previous run has finished
//! - Report skipped ticks and panicked runs to the observer
//!
//! # Design Decisions
//! - Skipped ticks are dropped, never queued
//! - Runs are spawned off the ticking loop so `stop()` never aborts one
//! - The in-flight flag is released by a guard, so a panicking run cannot
//!   wedge the schedule

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::scheduler::task::{stopped, ScheduledTask, SchedulerError, SharedObserver, Trigger};

/// Clears the in-flight flag when a run ends, however it ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Start calling `task` every `every`, skipping ticks that would overlap a
/// still-running invocation.
pub fn spawn_interval<F, Fut>(
    name: impl Into<String>,
    every: Duration,
    observer: SharedObserver,
    task: F,
) -> Result<ScheduledTask, SchedulerError>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if every.is_zero() {
        return Err(SchedulerError::ZeroInterval);
    }

    let name = name.into();
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let running = Arc::new(AtomicBool::new(false));

    let loop_name = name.clone();
    let driver = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop_rx) => break,
                _ = ticker.tick() => {}
            }

            if running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                observer.on_skip(&loop_name);
                continue;
            }

            let guard = RunGuard(running.clone());
            let run = task();
            let observer = observer.clone();
            let name = loop_name.clone();
            tokio::spawn(async move {
                let _guard = guard;
                observer.on_run_start(&name);
                let started = Instant::now();
                match tokio::spawn(run).await {
                    Ok(()) => observer.on_run_complete(&name, started.elapsed()),
                    Err(_) => observer.on_run_failed(&name),
                }
            });
        }

        observer.on_stopped(&loop_name);
    });

    Ok(ScheduledTask::new(name, Trigger::Interval(every), stop_tx, driver))
}
