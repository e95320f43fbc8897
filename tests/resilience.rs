//! Integration tests for retry, backoff and timeout behaviour.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{self, Instant};

use market_cache::resilience::{
    is_transient, retry_with_backoff, retry_with_timeout, with_timeout, ResilienceError, RetryPolicy,
};

mod common;
use common::RecordingRetryObserver;

fn reset() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_attempts_equal_retries_plus_one() {
    for max_retries in 0..=4u32 {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::transient()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(5))
            .jitter(false);

        let result: Result<(), _> = retry_with_backoff(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(reset()) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
        assert_eq!(err.attempts(), Some(max_retries + 1));
        assert_eq!(err.operation_error().unwrap().kind(), io::ErrorKind::ConnectionReset);
    }
}

#[tokio::test(start_paused = true)]
async fn test_third_attempt_succeeds() {
    let calls = AtomicU32::new(0);
    let observer = Arc::new(RecordingRetryObserver::default());
    let policy = RetryPolicy::transient()
        .max_retries(2)
        .initial_delay(Duration::from_millis(100))
        .multiplier(2.0)
        .jitter(false)
        .observe(observer.clone());

    let started = Instant::now();
    let result = retry_with_backoff(&policy, || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Err(reset())
            } else {
                Ok("quote")
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), "quote");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(observer.delays(), vec![Duration::from_millis(100), Duration::from_millis(200)]);
    assert_eq!(started.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_delays_capped_without_jitter() {
    let observer = Arc::new(RecordingRetryObserver::default());
    let policy = RetryPolicy::transient()
        .max_retries(6)
        .initial_delay(Duration::from_millis(100))
        .max_delay(Duration::from_millis(1000))
        .multiplier(3.0)
        .jitter(false)
        .observe(observer.clone());

    let _: Result<(), _> = retry_with_backoff(&policy, || async { Err(reset()) }).await;

    let expected: Vec<Duration> = [100, 300, 900, 1000, 1000, 1000]
        .into_iter()
        .map(Duration::from_millis)
        .collect();
    assert_eq!(observer.delays(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_jittered_delays_within_bounds() {
    let observer = Arc::new(RecordingRetryObserver::default());
    let policy = RetryPolicy::transient()
        .max_retries(5)
        .initial_delay(Duration::from_millis(100))
        .max_delay(Duration::from_millis(1000))
        .multiplier(2.0)
        .jitter(true)
        .observe(observer.clone());

    let _: Result<(), _> = retry_with_backoff(&policy, || async { Err(reset()) }).await;

    let bases = [100u64, 200, 400, 800, 1000];
    let delays = observer.delays();
    assert_eq!(delays.len(), bases.len());
    for (delay, base) in delays.iter().zip(bases) {
        let base = Duration::from_millis(base);
        assert!(*delay >= base, "{:?} below {:?}", delay, base);
        assert!(*delay < base.mul_f64(1.25), "{:?} above jitter bound of {:?}", delay, base);
    }
}

#[tokio::test(start_paused = true)]
async fn test_permanent_error_surfaces_immediately() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::transient().max_retries(5);

    let result: Result<(), _> = retry_with_backoff(&policy, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(io::Error::new(io::ErrorKind::PermissionDenied, "unauthorized")) }
    })
    .await;

    assert!(matches!(result, Err(ResilienceError::Operation(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fires_exactly_at_bound() {
    let bound = Duration::from_millis(250);

    let started = Instant::now();
    let result: Result<(), ResilienceError<io::Error>> = with_timeout(bound, async {
        time::sleep(Duration::from_secs(60)).await;
        Ok(())
    })
    .await;

    let err = result.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Operation timed out after 250ms");
    assert_eq!(started.elapsed(), bound);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_passes_fast_value_through() {
    let started = Instant::now();
    let result: Result<u32, ResilienceError<io::Error>> = with_timeout(Duration::from_secs(1), async {
        time::sleep(Duration::from_millis(40)).await;
        Ok(7)
    })
    .await;

    assert_eq!(result.unwrap(), 7);
    assert_eq!(started.elapsed(), Duration::from_millis(40));
}

/// Flips its flag when the future holding it is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_leaves_nothing_armed_after_settling() {
    let bound = Duration::from_millis(300);
    let sentinel = Duration::from_secs(7);

    // Timeout path: the slow operation and its inner timer are dropped at the bound.
    let dropped = Arc::new(AtomicBool::new(false));
    let flag = DropFlag(dropped.clone());
    let started = Instant::now();
    let result: Result<(), ResilienceError<io::Error>> = with_timeout(bound, async move {
        let _flag = flag;
        time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    })
    .await;
    assert!(result.unwrap_err().is_timeout());
    assert_eq!(started.elapsed(), bound);
    assert!(dropped.load(Ordering::SeqCst));

    // Success path: the deadline timer goes away with the settled future.
    let result: Result<u32, ResilienceError<io::Error>> = with_timeout(bound, async { Ok(1) }).await;
    assert_eq!(result.unwrap(), 1);
    assert_eq!(started.elapsed(), bound);

    assert_eq!(Handle::current().metrics().num_alive_tasks(), 0);

    // Nothing else is armed, so the paused clock advances exactly to the sentinel.
    let settled = Instant::now();
    time::sleep(sentinel).await;
    assert_eq!(settled.elapsed(), sentinel);
    assert_eq!(started.elapsed(), bound + sentinel);
}

#[tokio::test(start_paused = true)]
async fn test_retry_with_timeout_recovers_after_slow_attempt() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::transient()
        .max_retries(2)
        .initial_delay(Duration::from_millis(50))
        .jitter(false);

    let started = Instant::now();
    let result: Result<&str, ResilienceError<io::Error>> =
        retry_with_timeout(&policy, Duration::from_millis(200), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    time::sleep(Duration::from_secs(5)).await;
                }
                Ok("fresh")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "fresh");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(started.elapsed(), Duration::from_millis(250));
}

#[test]
fn test_wrapped_error_classifies_by_cause() {
    let err: ResilienceError<io::Error> = ResilienceError::Operation(reset());
    assert!(is_transient(&err));

    let err: ResilienceError<io::Error> = ResilienceError::Operation(io::Error::new(
        io::ErrorKind::NotFound,
        "unknown asset",
    ));
    assert!(!is_transient(&err));
}
