//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound a single async attempt by a deadline
//! - Surface expiry as a distinct `Timeout` error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the timer is owned by the returned future
//!   and dropped on every exit path, so nothing stays armed after settlement
//! - Works against Tokio's pausable clock, which keeps tests deterministic

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::resilience::error::ResilienceError;

/// Run `operation`, failing with [`ResilienceError::Timeout`] if it has not
/// settled within `duration`.
pub async fn with_timeout<T, E, F>(duration: Duration, operation: F) -> Result<T, ResilienceError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match time::timeout(duration, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ResilienceError::Operation(e)),
        Err(_) => Err(ResilienceError::timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_resolves_before_deadline() {
        let result: Result<u32, ResilienceError<io::Error>> =
            with_timeout(Duration::from_millis(100), async {
                time::sleep(Duration::from_millis(50)).await;
                Ok(7)
            })
            .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_exactly_at_bound() {
        let start = Instant::now();
        let result: Result<(), ResilienceError<io::Error>> =
            with_timeout(Duration::from_millis(100), async {
                time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        match result {
            Err(ResilienceError::Timeout { duration, message }) => {
                assert_eq!(duration, Duration::from_millis(100));
                assert!(message.contains("100ms"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_passes_through() {
        let result: Result<(), ResilienceError<io::Error>> =
            with_timeout(Duration::from_millis(100), async {
                Err(io::Error::new(io::ErrorKind::Other, "boom"))
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::Operation(_))));
    }
}
