//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Upper bound (exclusive) of the jitter scale factor.
pub const JITTER_MAX_FACTOR: f64 = 1.25;

/// Stateful delay generator for one retried operation.
///
/// Each call to [`Backoff::next_delay`] yields `min(current, max)`, optionally
/// scaled by a uniform factor in `[1.0, 1.25)`, and then grows `current` by the
/// multiplier for the following call.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: bool) -> Self {
        Self {
            current: initial,
            max,
            multiplier,
            jitter,
        }
    }

    /// Produce the next delay and advance the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let capped = self.current.min(self.max);
        let delay = if self.jitter { apply_jitter(capped) } else { capped };

        if self.current < self.max {
            self.current = scale(self.current, self.multiplier);
        }
        delay
    }
}

/// Delay before retry `index` (0-based) without jitter:
/// `min(initial * multiplier^index, max)`.
pub fn calculate_backoff(index: u32, initial: Duration, max: Duration, multiplier: f64) -> Duration {
    let factor = multiplier.powi(index.min(i32::MAX as u32) as i32);
    let scaled_ms = initial.as_millis() as f64 * factor;
    if !scaled_ms.is_finite() || scaled_ms >= max.as_millis() as f64 {
        return max;
    }
    Duration::from_millis(scaled_ms.round() as u64).min(max)
}

/// Scale `delay` by a uniform random factor in `[1.0, 1.25)`.
pub fn apply_jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(1.0..JITTER_MAX_FACTOR);
    scale(delay, factor)
}

/// Multiply a duration in nanosecond space, saturating instead of panicking.
fn scale(duration: Duration, factor: f64) -> Duration {
    let nanos = duration.as_nanos() as f64 * factor;
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Duration::from_nanos(u64::MAX);
    }
    Duration::from_nanos(nanos as u64)
}
