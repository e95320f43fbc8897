//! Transient-error classification.
//!
//! # Responsibilities
//! - Decide whether an arbitrary error is worth retrying
//! - Recognize connection failures, rate limiting and upstream overload
//!
//! # Design Decisions
//! - Walks the whole `source()` chain; wrappers do not hide the cause
//! - Structured signals (io kinds, HTTP status codes) are checked before message text
//! - Anything unrecognized is permanent

use std::error::Error;
use std::io;
use thiserror::Error;

/// HTTP status codes that indicate a temporary upstream condition.
pub const TRANSIENT_STATUS_CODES: [u16; 4] = [429, 502, 503, 504];

/// Message fragments (lower-case) that mark an error as transient.
const TRANSIENT_PATTERNS: &[&str] = &[
    "econnreset",
    "econnrefused",
    "etimedout",
    "connection reset",
    "connection refused",
    "connection aborted",
    "timed out",
    "timeout",
    "network",
    "socket",
    "rate limit",
    "ratelimit",
    "too many requests",
    "429",
    "502",
    "503",
    "504",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
];

/// A non-success HTTP status returned by an upstream.
///
/// Fetch implementations wrap this in their own error types so the status
/// code survives for classification.
#[derive(Debug, Clone, Error)]
#[error("upstream {url} responded with status {code}")]
pub struct UpstreamStatus {
    pub code: u16,
    pub url: String,
}

/// Whether `code` is a transient HTTP status.
pub fn is_transient_status(code: u16) -> bool {
    TRANSIENT_STATUS_CODES.contains(&code)
}

/// Classify `error` as transient (retryable) or permanent.
pub fn is_transient(error: &(dyn Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(verdict) = classify_structured(err) {
            return verdict;
        }
        if message_is_transient(&err.to_string()) {
            return true;
        }
        current = err.source();
    }
    false
}

/// Whether a free-form error message carries a transient signature.
pub fn message_is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Returns `Some(verdict)` when the error carries a structured signal that
/// decides the matter, `None` to fall through to message matching.
fn classify_structured(err: &(dyn Error + 'static)) -> Option<bool> {
    if let Some(status) = err.downcast_ref::<UpstreamStatus>() {
        return Some(is_transient_status(status.code));
    }

    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        return match io_err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::UnexpectedEof => Some(true),
            _ => None,
        };
    }

    if let Some(http_err) = err.downcast_ref::<reqwest::Error>() {
        if let Some(status) = http_err.status() {
            return Some(is_transient_status(status.as_u16()));
        }
        if http_err.is_timeout() || http_err.is_connect() {
            return Some(true);
        }
        if http_err.is_decode() || http_err.is_builder() {
            return Some(false);
        }
    }

    None
}
