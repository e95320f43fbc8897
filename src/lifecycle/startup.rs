//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the metrics exporter
//! - Build the market source and cache from configuration
//! - Start the periodic refresh and arm the daily refresh
//! - Tear everything down in reverse order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - `Runtime` is the only place long-lived state is held; nothing is global
//!   except the metrics recorder, which the exporter requires
//! - The daily task holds a weak reference, so dropping the runtime is enough
//!   to make it a no-op

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheOptions, RefreshCache};
use crate::config::AppConfig;
use crate::lifecycle::Shutdown;
use crate::observability::{metrics, LoggingTaskObserver};
use crate::scheduler::{spawn_daily_at_utc, ScheduledTask, SchedulerError, SystemClock};
use crate::sources::{FetchError, HttpMarketSource};

/// The cache type the binary runs.
pub type MarketCache = RefreshCache<HttpMarketSource>;

const CACHE_NAME: &str = "market";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build market source: {0}")]
    Source(#[from] FetchError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to schedule task: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Long-lived state of a running service.
pub struct Runtime {
    config: AppConfig,
    cache: Arc<MarketCache>,
    daily: Option<ScheduledTask>,
    shutdown: Shutdown,
}

impl Runtime {
    /// Build and start: first refresh, periodic refresh, daily refresh.
    pub async fn init(config: AppConfig) -> Result<Self, StartupError> {
        let mut runtime = Self::build(config)?;
        runtime.start().await?;
        Ok(runtime)
    }

    /// Wire up every component without fetching or spawning anything.
    pub fn build(config: AppConfig) -> Result<Self, StartupError> {
        if config.observability.metrics_enabled {
            let addr: SocketAddr = config
                .observability
                .metrics_address
                .parse()
                .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
            metrics::init_metrics(addr)?;
        }

        let source = Arc::new(HttpMarketSource::new(&config.source)?);
        tracing::info!(base_url = %source.base_url(), ids = config.source.ids.len(), "Market source ready");

        let options = CacheOptions::from_config(&config.cache, &config.retry);
        let cache = RefreshCache::new(CACHE_NAME, source, config.source.ids.clone(), options);

        Ok(Self {
            config,
            cache,
            daily: None,
            shutdown: Shutdown::new(),
        })
    }

    /// Start the cache and, when enabled, the daily refresh.
    pub async fn start(&mut self) -> Result<(), StartupError> {
        self.cache.start().await?;

        if self.config.daily.enabled && self.daily.is_none() {
            self.daily = Some(self.spawn_daily()?);
        }
        Ok(())
    }

    fn spawn_daily(&self) -> Result<ScheduledTask, SchedulerError> {
        let cache = Arc::downgrade(&self.cache);
        spawn_daily_at_utc(
            "daily-refresh",
            self.config.daily.hour_utc,
            Arc::new(SystemClock),
            Arc::new(LoggingTaskObserver),
            move || {
                let cache = cache.clone();
                async move {
                    let Some(cache) = cache.upgrade() else {
                        return;
                    };
                    let outcome = cache.force_refresh().await;
                    let status = cache.get_cache_status();
                    tracing::info!(
                        cache = %status.name,
                        skipped = outcome.is_skipped(),
                        records = status.record_count,
                        has_aggregate = status.has_aggregate,
                        last_updated = ?status.last_updated,
                        "Daily cache summary"
                    );
                }
            },
        )
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<MarketCache> {
        &self.cache
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn daily_task(&self) -> Option<&ScheduledTask> {
        self.daily.as_ref()
    }

    /// Stop every scheduled task and wait for the daily driver to exit.
    pub async fn teardown(mut self) {
        tracing::info!("Tearing down");
        self.shutdown.trigger();
        self.cache.stop();
        if let Some(daily) = self.daily.take() {
            daily.stop();
            daily.join().await;
        }
        tracing::info!("Shutdown complete");
    }
}
