//! CoinGecko Client
//!
//! Fetches coin metadata for the image URLs CoinMarketCap does not serve.
//! The detail endpoint treats this enrichment as best-effort: a CoinGecko
//! failure never fails the request.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::markets::{MarketError, TtlCache};

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Image URLs at the sizes CoinGecko publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinImage {
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    /// Small image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small: Option<String>,
    /// Large image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinInfo {
    #[serde(default)]
    image: Option<CoinImage>,
}

/// CoinGecko REST client. The API key is optional; without one the
/// public rate limits apply.
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    images: TtlCache<String, CoinImage>,
}

impl CoinGeckoClient {
    /// Create a client against the production API.
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (tests).
    #[must_use]
    pub fn with_base_url(
        http: reqwest::Client,
        api_key: Option<String>,
        base_url: String,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            images: TtlCache::new(CACHE_TTL),
        }
    }

    /// Image URLs for a coin id, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or when the coin has no
    /// image block.
    pub async fn coin_image(&self, coin_id: &str) -> Result<CoinImage, MarketError> {
        if let Some(cached) = self.images.get(&coin_id.to_string()) {
            return Ok(cached);
        }

        let url = format!("{}/coins/{coin_id}", self.base_url);
        let mut request = self.http.get(&url).query(&[
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "false"),
            ("community_data", "false"),
            ("developer_data", "false"),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let info: CoinInfo = request.send().await?.error_for_status()?.json().await?;
        let image = info
            .image
            .ok_or_else(|| MarketError::MissingData(format!("no image for coin {coin_id}")))?;

        self.images.insert(coin_id.to_string(), image.clone());
        Ok(image)
    }
}

impl std::fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_info_parses_image_block() {
        let json = r#"{"id":"bitcoin","name":"Bitcoin","image":{"thumb":"t.png","small":"s.png","large":"l.png"}}"#;
        let info: CoinInfo = serde_json::from_str(json).unwrap();
        let image = info.image.unwrap();
        assert_eq!(image.large.as_deref(), Some("l.png"));
    }

    #[test]
    fn coin_info_tolerates_missing_image() {
        let info: CoinInfo = serde_json::from_str(r#"{"id":"bitcoin"}"#).unwrap();
        assert!(info.image.is_none());
    }

    #[test]
    fn image_serializes_without_absent_sizes() {
        let image = CoinImage {
            large: Some("l.png".to_string()),
            ..CoinImage::default()
        };
        assert_eq!(
            serde_json::to_string(&image).unwrap(),
            r#"{"large":"l.png"}"#
        );
    }
}
