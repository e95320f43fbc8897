//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, hour within a day)
//! - Check the source URL parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("source.base_url is not a valid URL: {0}")]
    InvalidBaseUrl(String),

    #[error("source.ids must list at least one identifier")]
    NoIds,

    #[error("source.ids contains an empty identifier")]
    EmptyId,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("retry.multiplier must be >= 1.0, got {0}")]
    Multiplier(f64),

    #[error("retry.initial_delay_ms ({initial}) exceeds retry.max_delay_ms ({max})")]
    DelayOrder { initial: u64, max: u64 },

    #[error("daily.hour_utc must be within 0..=23, got {0}")]
    Hour(u32),

    #[error("observability.metrics_address is not a socket address: {0}")]
    MetricsAddress(String),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Url::parse(&config.source.base_url).is_err() {
        errors.push(ValidationError::InvalidBaseUrl(config.source.base_url.clone()));
    }
    if config.source.ids.is_empty() {
        errors.push(ValidationError::NoIds);
    } else if config.source.ids.iter().any(|id| id.trim().is_empty()) {
        errors.push(ValidationError::EmptyId);
    }

    if config.cache.refresh_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "cache.refresh_interval_secs" });
    }
    if config.cache.fetch_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "cache.fetch_timeout_ms" });
    }

    let retry = &config.retry;
    if !(retry.multiplier >= 1.0 && retry.multiplier.is_finite()) {
        errors.push(ValidationError::Multiplier(retry.multiplier));
    }
    if retry.max_delay_ms == 0 {
        errors.push(ValidationError::Zero { field: "retry.max_delay_ms" });
    }
    if retry.initial_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            initial: retry.initial_delay_ms,
            max: retry.max_delay_ms,
        });
    }

    if config.daily.hour_utc > 23 {
        errors.push(ValidationError::Hour(config.daily.hour_utc));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
