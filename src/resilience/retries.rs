//! Retry logic.
//!
//! # Responsibilities
//! - Execute an operation up to `max_retries + 1` times
//! - Consult a retryability predicate after every failure
//! - Sleep with exponential backoff (+ optional jitter) between attempts
//! - Report each scheduled retry to an observer
//!
//! # Design Decisions
//! - Permanent errors propagate immediately without consuming the budget
//! - Exhaustion keeps only the last error, so the failure payload has a fixed size
//! - In the combined variant the timeout applies per attempt, and a timed-out
//!   attempt is always retryable
//! - No logging here; callers attach an observer

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;
use crate::resilience::classify::is_transient;
use crate::resilience::error::ResilienceError;
use crate::resilience::timeouts::with_timeout;

/// Decides whether a failed attempt may be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&ResilienceError<E>) -> bool + Send + Sync>;

/// Notified before each backoff sleep with `(attempt, error, delay)`.
pub trait RetryObserver<E>: Send + Sync {
    fn on_retry(&self, attempt: u32, error: &ResilienceError<E>, delay: Duration);
}

impl<E, F> RetryObserver<E> for F
where
    F: Fn(u32, &ResilienceError<E>, Duration) + Send + Sync,
{
    fn on_retry(&self, attempt: u32, error: &ResilienceError<E>, delay: Duration) {
        self(attempt, error, delay)
    }
}

/// Retry configuration for one retried operation.
///
/// Immutable once built; clone it to derive a variant.
pub struct RetryPolicy<E> {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
    retryable: RetryPredicate<E>,
    observer: Option<Arc<dyn RetryObserver<E>>>,
}

impl<E> RetryPolicy<E> {
    /// Create a policy with an explicit predicate and default timings.
    pub fn with_predicate<P>(predicate: P) -> Self
    where
        P: Fn(&ResilienceError<E>) -> bool + Send + Sync + 'static,
    {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            initial_delay: Duration::from_millis(defaults.initial_delay_ms),
            max_delay: Duration::from_millis(defaults.max_delay_ms),
            multiplier: defaults.multiplier,
            jitter: defaults.jitter,
            retryable: Arc::new(predicate),
            observer: None,
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Replace the retryability predicate.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ResilienceError<E>) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(predicate);
        self
    }

    /// Attach a per-attempt observer.
    pub fn observe(mut self, observer: Arc<dyn RetryObserver<E>>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Apply timings from configuration, keeping predicate and observer.
    pub fn with_config(self, config: &RetryConfig) -> Self {
        self.max_retries(config.max_retries)
            .initial_delay(Duration::from_millis(config.initial_delay_ms))
            .max_delay(Duration::from_millis(config.max_delay_ms))
            .multiplier(config.multiplier)
            .jitter(config.jitter)
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn is_retryable(&self, error: &ResilienceError<E>) -> bool {
        (self.retryable)(error)
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay, self.max_delay, self.multiplier, self.jitter)
    }
}

impl<E: Error + 'static> RetryPolicy<E> {
    /// Policy using the transient-error classifier as its predicate.
    pub fn transient() -> Self {
        Self::with_predicate(|e: &ResilienceError<E>| is_transient(e))
    }

    /// Transient-classifier policy with timings from configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::transient().with_config(config)
    }
}

impl<E: Error + 'static> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::transient()
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_retries: self.max_retries,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            jitter: self.jitter,
            retryable: self.retryable.clone(),
            observer: self.observer.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Execute `operation` with retries according to `policy`.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy<E>,
    mut operation: F,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run(policy, |_| false, || {
        let attempt = operation();
        async move { attempt.await.map_err(ResilienceError::Operation) }
    })
    .await
}

/// Execute `operation` with retries, bounding every attempt by `timeout`.
///
/// Timed-out attempts are retried regardless of the policy's predicate.
pub async fn retry_with_timeout<T, E, F, Fut>(
    policy: &RetryPolicy<E>,
    timeout: Duration,
    mut operation: F,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run(policy, ResilienceError::is_timeout, || {
        with_timeout(timeout, operation())
    })
    .await
}

async fn run<T, E, F, Fut>(
    policy: &RetryPolicy<E>,
    always_retry: fn(&ResilienceError<E>) -> bool,
    mut attempt_once: F,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ResilienceError<E>>>,
{
    let max_attempts = policy.max_retries.saturating_add(1);
    let mut backoff = policy.backoff();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let error = match attempt_once().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !always_retry(&error) && !policy.is_retryable(&error) {
            return Err(error);
        }

        if attempt >= max_attempts {
            return Err(ResilienceError::RetryExhausted {
                attempts: attempt,
                last_error: Box::new(error),
            });
        }

        let delay = backoff.next_delay();
        if let Some(observer) = &policy.observer {
            observer.on_retry(attempt, &error, delay);
        }
        time::sleep(delay).await;
    }
}
