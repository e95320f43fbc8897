//! Failure taxonomy for resilient operations.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors produced by the timeout and retry wrappers.
///
/// `E` is the error type of the wrapped operation. Implemented by hand rather
/// than with `thiserror` because `RetryExhausted` nests the enum itself.
#[derive(Debug)]
pub enum ResilienceError<E> {
    /// An attempt did not settle within its bound.
    Timeout {
        /// The configured bound.
        duration: Duration,
        /// Human-readable description.
        message: String,
    },

    /// Every allowed attempt failed. Only the most recent failure is kept.
    RetryExhausted {
        /// Total attempts made (`max_retries + 1`).
        attempts: u32,
        /// The failure of the final attempt.
        last_error: Box<ResilienceError<E>>,
    },

    /// The wrapped operation itself failed.
    Operation(E),
}

impl<E> ResilienceError<E> {
    /// Build a timeout error with the standard message.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout {
            duration,
            message: format!("Operation timed out after {}ms", duration.as_millis()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Number of attempts recorded, if this is an exhaustion error.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetryExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The innermost operation error, looking through exhaustion wrappers.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::RetryExhausted { last_error, .. } => last_error.operation_error(),
            Self::Timeout { .. } => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ResilienceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { message, .. } => write!(f, "{}", message),
            Self::RetryExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "Operation failed after {} attempts: {}",
                attempts, last_error
            ),
            Self::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl<E: Error + 'static> Error for ResilienceError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Timeout { .. } => None,
            Self::RetryExhausted { last_error, .. } => Some(last_error.as_ref()),
            Self::Operation(e) => Some(e),
        }
    }
}
