//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the market cache service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream data source settings.
    pub source: SourceConfig,

    /// Refresh cadence and per-attempt timeout.
    pub cache: CacheConfig,

    /// Retry policy applied to every upstream fetch.
    pub retry: RetryConfig,

    /// Daily full refresh at a fixed UTC hour.
    pub daily: DailyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Upstream market data API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of a CoinGecko-compatible API.
    pub base_url: String,

    /// Asset identifiers to track.
    pub ids: Vec<String>,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Optional API key, sent as `x-cg-pro-api-key`.
    pub api_key: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            ids: vec!["bitcoin".to_string(), "ethereum".to_string()],
            user_agent: concat!("market-cache/", env!("CARGO_PKG_VERSION")).to_string(),
            api_key: None,
        }
    }
}

/// Cache refresh configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Interval between scheduled refreshes in seconds.
    pub refresh_interval_secs: u64,

    /// Timeout for a single fetch attempt in milliseconds.
    pub fetch_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            fetch_timeout_ms: 10_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor applied after each retry.
    pub multiplier: f64,

    /// Scale each delay by a random factor in [1.0, 1.25).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Daily scheduled refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DailyConfig {
    /// Enable the daily refresh task.
    pub enabled: bool,

    /// Hour of day (UTC, 0-23) at which it fires.
    pub hour_utc: u32,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour_utc: 0,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
