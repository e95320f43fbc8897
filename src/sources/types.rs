//! Market data records held by the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest quote for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Asset identifier (e.g. "bitcoin").
    pub id: String,
    pub price_usd: f64,
    pub volume_24h_usd: Option<f64>,
    pub change_24h_pct: Option<f64>,
    /// When the upstream reported this value, if it says.
    pub source_updated_at: Option<DateTime<Utc>>,
}

/// Market-wide figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub total_market_cap_usd: Option<f64>,
    pub total_volume_24h_usd: Option<f64>,
    pub active_assets: Option<u64>,
    pub market_cap_change_24h_pct: Option<f64>,
}

/// One entry of `/simple/price`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SimplePriceEntry {
    pub usd: Option<f64>,
    pub usd_24h_vol: Option<f64>,
    pub usd_24h_change: Option<f64>,
    pub last_updated_at: Option<i64>,
}

/// `/global` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GlobalResponse {
    pub data: GlobalData,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GlobalData {
    pub active_cryptocurrencies: Option<u64>,
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub total_volume: HashMap<String, f64>,
    pub market_cap_change_percentage_24h_usd: Option<f64>,
}

impl SimplePriceEntry {
    /// Entries without a USD price are dropped.
    pub(crate) fn into_record(self, id: String) -> Option<PriceRecord> {
        let price_usd = self.usd?;
        Some(PriceRecord {
            id,
            price_usd,
            volume_24h_usd: self.usd_24h_vol,
            change_24h_pct: self.usd_24h_change,
            source_updated_at: self
                .last_updated_at
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        })
    }
}

impl From<GlobalData> for MarketOverview {
    fn from(data: GlobalData) -> Self {
        Self {
            total_market_cap_usd: data.total_market_cap.get("usd").copied(),
            total_volume_24h_usd: data.total_volume.get("usd").copied(),
            active_assets: data.active_cryptocurrencies,
            market_cap_change_24h_pct: data.market_cap_change_percentage_24h_usd,
        }
    }
}
