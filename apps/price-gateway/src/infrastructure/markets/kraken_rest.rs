//! Kraken Public REST Client
//!
//! OHLC candles from `api.kraken.com`. Kraken answers with an `error`
//! array plus a `result` object keyed by its own normalized pair name, so
//! the pair key is discovered rather than assumed. Candle prices arrive
//! as strings and are reshaped to the `[ts_ms, open, high, low, close]`
//! form the history endpoint serves.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infrastructure::markets::{MarketError, TtlCache};

const DEFAULT_BASE_URL: &str = "https://api.kraken.com/0/public";
const CACHE_TTL: Duration = Duration::from_secs(60);

/// One candle: `[timestamp_ms, open, high, low, close]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle(pub i64, pub f64, pub f64, pub f64, pub f64);

/// Kraken public REST client with short-TTL response caching.
#[derive(Debug)]
pub struct KrakenRestClient {
    http: reqwest::Client,
    base_url: String,
    candles: TtlCache<(String, u32), Vec<Candle>>,
}

impl KrakenRestClient {
    /// Create a client against the production API.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (tests).
    #[must_use]
    pub fn with_base_url(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            candles: TtlCache::new(CACHE_TTL),
        }
    }

    /// OHLC candles for a pair at an interval in minutes.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-empty Kraken `error`
    /// array, or a result with no pair data.
    pub async fn ohlc(&self, pair: &str, interval: u32) -> Result<Vec<Candle>, MarketError> {
        let key = (pair.to_string(), interval);
        if let Some(cached) = self.candles.get(&key) {
            return Ok(cached);
        }

        let url = format!("{}/OHLC", self.base_url);
        let body: Value = self
            .http
            .get(&url)
            .query(&[("pair", pair), ("interval", &interval.to_string())])
            .send()
            .await?
            .json()
            .await?;

        let candles = parse_ohlc_response(&body)?;
        self.candles.insert(key, candles.clone());
        Ok(candles)
    }
}

/// Unwrap Kraken's `{error, result}` envelope and reshape the candles.
fn parse_ohlc_response(body: &Value) -> Result<Vec<Candle>, MarketError> {
    if let Some(errors) = body.get("error").and_then(Value::as_array)
        && !errors.is_empty()
    {
        let detail = errors
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(MarketError::Provider(format!("Kraken API error: {detail}")));
    }

    let result = body
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| MarketError::MissingData("missing result object".to_string()))?;

    // The result is keyed by Kraken's normalized pair name, which may
    // differ from the requested pair; `last` is a cursor, not a pair.
    let raw = result
        .iter()
        .find(|(key, _)| *key != "last")
        .map(|(_, value)| value)
        .and_then(Value::as_array)
        .ok_or_else(|| MarketError::MissingData("no OHLC data returned".to_string()))?;

    raw.iter().map(parse_candle).collect()
}

/// One raw candle: `[ts, open, high, low, close, vwap, volume, count]`,
/// with the prices as strings.
fn parse_candle(raw: &Value) -> Result<Candle, MarketError> {
    let fields = raw
        .as_array()
        .filter(|f| f.len() >= 5)
        .ok_or_else(|| MarketError::MissingData("candle is not a 5+ element array".to_string()))?;

    let ts = number(&fields[0])
        .ok_or_else(|| MarketError::MissingData("candle timestamp is not a number".to_string()))?;

    let mut prices = [0.0; 4];
    for (i, slot) in prices.iter_mut().enumerate() {
        *slot = number(&fields[i + 1]).ok_or_else(|| {
            MarketError::MissingData(format!("candle field {} is not a number", i + 1))
        })?;
    }

    #[allow(clippy::cast_possible_truncation)]
    let ts_ms = (ts * 1000.0) as i64;
    Ok(Candle(ts_ms, prices[0], prices[1], prices[2], prices[3]))
}

/// Kraken mixes JSON numbers and numeric strings within one candle.
fn number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_candles_with_string_prices() {
        let body = json!({
            "error": [],
            "result": {
                "XXBTZUSD": [
                    [1_688_671_200, "30306.1", "30306.2", "30305.7", "30305.9", "30306.0", "3.39", 23]
                ],
                "last": 1_688_672_160
            }
        });

        let candles = parse_ohlc_response(&body).unwrap();
        assert_eq!(
            candles,
            vec![Candle(1_688_671_200_000, 30306.1, 30306.2, 30305.7, 30305.9)]
        );
    }

    #[test]
    fn pair_key_is_discovered_not_assumed() {
        // Requested "BTCUSD", Kraken normalizes to "XXBTZUSD".
        let body = json!({
            "error": [],
            "result": {
                "last": 1,
                "XXBTZUSD": [[100, "1", "2", "0.5", "1.5", "1", "9", 2]]
            }
        });

        let candles = parse_ohlc_response(&body).unwrap();
        assert_eq!(candles[0].0, 100_000);
    }

    #[test]
    fn error_array_is_surfaced() {
        let body = json!({"error": ["EQuery:Unknown asset pair"], "result": {}});
        let err = parse_ohlc_response(&body).unwrap_err();
        assert!(matches!(err, MarketError::Provider(m) if m.contains("Unknown asset pair")));
    }

    #[test]
    fn empty_result_is_an_error() {
        let body = json!({"error": [], "result": {"last": 1}});
        assert!(matches!(
            parse_ohlc_response(&body).unwrap_err(),
            MarketError::MissingData(_)
        ));
    }

    #[test]
    fn candle_serializes_as_flat_array() {
        let candle = Candle(100_000, 1.0, 2.0, 0.5, 1.5);
        assert_eq!(
            serde_json::to_string(&candle).unwrap(),
            "[100000,1.0,2.0,0.5,1.5]"
        );
    }
}
