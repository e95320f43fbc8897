//! Wall-clock capability.
//!
//! Timers always go through `tokio::time`, which tests pause and advance.
//! Wall-clock reads go through [`Clock`] so UTC arithmetic can be driven by
//! the same virtual time.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use tokio::time::Instant;

/// Source of the current UTC time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to `anchor` at construction and advanced by Tokio's
/// monotonic clock.
///
/// Under a paused runtime, `tokio::time::advance` and auto-advance move this
/// clock in lock-step with every timer.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    anchor: DateTime<Utc>,
    started: Instant,
}

impl AnchoredClock {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().duration_since(self.started);
        chrono::Duration::from_std(elapsed)
            .ok()
            .and_then(|delta| self.anchor.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_anchored_clock_follows_virtual_time() {
        let anchor = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = AnchoredClock::new(anchor);
        assert_eq!(clock.now(), anchor);

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), anchor + chrono::Duration::seconds(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_anchored_clock_saturates_at_max() {
        let anchor = DateTime::<Utc>::MAX_UTC - chrono::Duration::seconds(10);
        let clock = AnchoredClock::new(anchor);
        assert_eq!(clock.now(), anchor);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }
}
