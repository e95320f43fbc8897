//! Upstream data sources.
//!
//! The cache only knows the `SnapshotSource` trait; this module supplies the
//! HTTP implementation used by the binary.

pub mod http;
pub mod types;

pub use http::{FetchError, HttpMarketSource};
pub use types::{MarketOverview, PriceRecord};
