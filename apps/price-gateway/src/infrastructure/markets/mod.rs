//! Market Data Providers
//!
//! REST clients for the aggregation endpoints: CoinMarketCap for listings
//! and quotes, CoinGecko for high-quality coin images, and Kraken's public
//! REST API for OHLC candles. Each client caches responses in-process with
//! a short TTL so bursts of identical requests hit the provider once.

pub mod cache;
pub mod cmc;
pub mod coingecko;
pub mod kraken_rest;

pub use cache::TtlCache;
pub use cmc::CmcClient;
pub use coingecko::{CoinGeckoClient, CoinImage};
pub use kraken_rest::{Candle, KrakenRestClient};

/// Errors from the market data providers.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// HTTP transport or decode failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned an explicit error payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider response is missing an expected field.
    #[error("malformed provider response: {0}")]
    MissingData(String),
}
