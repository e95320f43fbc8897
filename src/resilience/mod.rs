//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Fetch of an external resource:
//!     → retries.rs (attempt loop, backoff between attempts)
//!     → timeouts.rs (each attempt bounded independently)
//!     → classify.rs (retryable? transient vs permanent)
//!     → error.rs (Timeout / RetryExhausted / Operation)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only transient failures consume the retry budget
//! - Jittered backoff prevents synchronized retry storms
//! - No logging or metrics here; observers are passed in explicitly

pub mod backoff;
pub mod classify;
pub mod error;
pub mod retries;
pub mod timeouts;

pub use classify::{is_transient, UpstreamStatus};
pub use error::ResilienceError;
pub use retries::{retry_with_backoff, retry_with_timeout, RetryObserver, RetryPolicy};
pub use timeouts::with_timeout;
