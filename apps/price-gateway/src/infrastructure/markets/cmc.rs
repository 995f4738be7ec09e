//! CoinMarketCap Client
//!
//! Listings and per-currency quotes. Responses pass through as JSON with
//! the provider's envelope stripped, so the REST layer serves the `data`
//! payload shape directly.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{CurrencyResolver, ResolveError};
use crate::infrastructure::markets::{MarketError, TtlCache};

const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";
const LISTINGS_TTL: Duration = Duration::from_secs(60);
const QUOTES_TTL: Duration = Duration::from_secs(30);

/// CoinMarketCap REST client with short-TTL response caching.
pub struct CmcClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    listings: TtlCache<(), Value>,
    currencies: TtlCache<i64, Value>,
}

impl CmcClient {
    /// Create a client against the production API.
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (tests, sandbox).
    #[must_use]
    pub fn with_base_url(http: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
            listings: TtlCache::new(LISTINGS_TTL),
            currencies: TtlCache::new(QUOTES_TTL),
        }
    }

    /// Top cryptocurrencies by market cap, as the provider's `data` array.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    pub async fn listings(&self) -> Result<Value, MarketError> {
        if let Some(cached) = self.listings.get(&()) {
            return Ok(cached);
        }

        let url = format!("{}/v1/cryptocurrency/listings/latest", self.base_url);
        let body: Value = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .json()
            .await?;

        let data = extract_data(body)?;
        self.listings.insert((), data.clone());
        Ok(data)
    }

    /// Quote and metadata for one currency, as the provider's per-id object.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, an error envelope, or an
    /// unknown currency id.
    pub async fn currency(&self, currency_id: i64) -> Result<Value, MarketError> {
        if let Some(cached) = self.currencies.get(&currency_id) {
            return Ok(cached);
        }

        let url = format!("{}/v2/cryptocurrency/quotes/latest", self.base_url);
        let body: Value = self
            .http
            .get(&url)
            .query(&[("id", currency_id)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .json()
            .await?;

        let data = extract_data(body)?;
        let entry = data
            .get(currency_id.to_string())
            .cloned()
            .ok_or_else(|| MarketError::MissingData(format!("no entry for id {currency_id}")))?;

        self.currencies.insert(currency_id, entry.clone());
        Ok(entry)
    }
}

impl std::fmt::Debug for CmcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmcClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CurrencyResolver for CmcClient {
    async fn ticker_symbol(&self, currency_id: i64) -> Result<String, ResolveError> {
        let entry = self.currency(currency_id).await.map_err(|e| match e {
            MarketError::MissingData(_) => ResolveError::UnknownCurrency(currency_id),
            other => ResolveError::Provider(other.to_string()),
        })?;

        entry
            .get("symbol")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ResolveError::UnknownCurrency(currency_id))
    }
}

/// Unwrap the CMC envelope, surfacing its error message when present.
fn extract_data(body: Value) -> Result<Value, MarketError> {
    if let Some(message) = body
        .get("status")
        .and_then(|s| s.get("error_message"))
        .and_then(Value::as_str)
    {
        return Err(MarketError::Provider(message.to_string()));
    }

    body.get("data")
        .cloned()
        .ok_or_else(|| MarketError::MissingData("missing data field".to_string()))
}

// =============================================================================
// Tests
// =============================================================================
