//! market-cache service
//!
//! Keeps an in-memory snapshot of market prices and market-wide figures,
//! refreshed from an upstream HTTP API.
//!
//! # Architecture Overview
//!
//! ```text
//!     ┌──────────────────────────────────────────────────────────────────┐
//!     │                          MARKET CACHE                            │
//!     │                                                                  │
//!     │  ┌───────────┐   tick    ┌──────────────┐   fetch   ┌─────────┐  │
//!     │  │ scheduler │──────────▶│ RefreshCache │──────────▶│ sources │──┼──▶ Upstream API
//!     │  │ interval  │           │ single-flight│           │  http   │  │
//!     │  │ daily     │           └──────┬───────┘           └─────────┘  │
//!     │  └───────────┘                  │ snapshot                ▲      │
//!     │                                 ▼                         │      │
//!     │                          readers (status,          resilience    │
//!     │                          records, aggregate)   retry/timeout/    │
//!     │                                                 classification   │
//!     │                                                                  │
//!     │  ┌────────────────────────────────────────────────────────────┐  │
//!     │  │ config │ observability (tracing, metrics) │ lifecycle      │  │
//!     │  └────────────────────────────────────────────────────────────┘  │
//!     └──────────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use market_cache::config::{load_config, AppConfig};
use market_cache::lifecycle::{signals, Runtime};
use market_cache::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "market-cache", version, about = "Refresh-coordinated market data cache")]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refresh once, print the cache status as JSON and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "market-cache starting");

    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "Configuration loaded");
    }

    if cli.once {
        config.observability.metrics_enabled = false;
        let runtime = Runtime::build(config)?;
        runtime.cache().force_refresh().await;
        println!("{}", serde_json::to_string_pretty(&runtime.cache().get_cache_status())?);
        println!("{}", serde_json::to_string_pretty(&runtime.cache().get_records())?);
        runtime.teardown().await;
        return Ok(());
    }

    let runtime = Runtime::init(config).await?;
    let status = runtime.cache().get_cache_status();
    tracing::info!(
        records = status.record_count,
        has_aggregate = status.has_aggregate,
        "Initial refresh complete"
    );

    let mut shutdown_rx = runtime.shutdown().subscribe();
    tokio::spawn(signals::wait_for_shutdown(runtime.shutdown().clone()));
    let _ = shutdown_rx.recv().await;

    runtime.teardown().await;
    Ok(())
}
