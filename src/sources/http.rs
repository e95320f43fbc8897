//! HTTP market data source.
//!
//! # Responsibilities
//! - Fetch per-asset prices and market-wide figures from a CoinGecko-compatible API
//! - Map non-success statuses to errors the transient classifier understands
//!
//! # Design Decisions
//! - No retries or timeouts here; the cache wraps every call
//! - A single pooled `reqwest::Client` per source

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

use crate::cache::SnapshotSource;
use crate::config::SourceConfig;
use crate::resilience::UpstreamStatus;
use crate::sources::types::{GlobalResponse, MarketOverview, PriceRecord, SimplePriceEntry};

/// Errors from the HTTP source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid source URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream rejected request")]
    Status(#[from] UpstreamStatus),
}

/// [`SnapshotSource`] backed by a CoinGecko-compatible REST API.
#[derive(Debug, Clone)]
pub struct HttpMarketSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMarketSource {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key)?;
            value.set_sensitive(true);
            headers.insert("x-cg-pro-api-key", value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Use a caller-built client (custom proxy, TLS or pool settings).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, FetchError> {
        // Trailing slash so `join` appends instead of replacing the last segment.
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn prices_url(&self, ids: &[String]) -> Result<Url, FetchError> {
        let mut url = self.base_url.join("simple/price")?;
        url.query_pairs_mut()
            .append_pair("ids", &ids.join(","))
            .append_pair("vs_currencies", "usd")
            .append_pair("include_24hr_vol", "true")
            .append_pair("include_24hr_change", "true")
            .append_pair("include_last_updated_at", "true");
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamStatus {
                code: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SnapshotSource for HttpMarketSource {
    type Record = PriceRecord;
    type Aggregate = MarketOverview;
    type Error = FetchError;

    async fn fetch_records(&self, ids: &[String]) -> Result<HashMap<String, PriceRecord>, FetchError> {
        let url = self.prices_url(ids)?;
        let entries: HashMap<String, SimplePriceEntry> = self.get_json(url).await?;

        Ok(entries
            .into_iter()
            .filter_map(|(id, entry)| entry.into_record(id.clone()).map(|record| (id, record)))
            .collect())
    }

    async fn fetch_aggregate(&self) -> Result<MarketOverview, FetchError> {
        let url = self.base_url.join("global")?;
        let global: GlobalResponse = self.get_json(url).await?;
        Ok(global.data.into())
    }
}
