//! Price Types and Last-Known-Price Cache
//!
//! The viewer wire messages and the per-symbol cache of the most recent
//! price, used to hand a newly connecting viewer an immediate snapshot
//! before the next upstream tick arrives.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// =============================================================================
// Viewer Messages
// =============================================================================

/// Outbound message to a viewer connection.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "price_update", "symbol": "BTC/USD", "price": 50000.12, "timestamp": null}
/// {"type": "pong"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerMessage {
    /// A forwarded price tick.
    PriceUpdate {
        /// Trading pair the tick is for.
        symbol: String,
        /// Last trade price.
        price: f64,
        /// Upstream timestamp in milliseconds, when known.
        timestamp: Option<i64>,
    },
    /// Reply to a viewer liveness ping.
    Pong,
}

impl ViewerMessage {
    /// Build a price update for `symbol`.
    #[must_use]
    pub fn price_update(symbol: &str, price: f64) -> Self {
        Self::PriceUpdate {
            symbol: symbol.to_string(),
            price,
            timestamp: None,
        }
    }
}

/// Check whether an upstream tick carries a usable price.
///
/// Kraken occasionally reports zeroed entries; those are dropped rather
/// than broadcast or cached.
#[must_use]
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

// =============================================================================
// Price Cache
// =============================================================================

/// Most recent price per symbol. Overwritten on every tick; not persisted.
#[derive(Debug, Default)]
pub struct PriceCache {
    prices: Mutex<HashMap<String, f64>>,
}

impl PriceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest price for `symbol`.
    pub fn record(&self, symbol: &str, price: f64) {
        self.prices.lock().insert(symbol.to_string(), price);
    }

    /// The last-known price for `symbol`, if any tick has been seen.
    #[must_use]
    pub fn last(&self, symbol: &str) -> Option<f64> {
        self.prices.lock().get(symbol).copied()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_update_wire_format() {
        let msg = ViewerMessage::price_update("BTC/USD", 50000.12);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"price_update","symbol":"BTC/USD","price":50000.12,"timestamp":null}"#
        );
    }

    #[test]
    fn pong_wire_format() {
        let json = serde_json::to_string(&ViewerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn invalid_prices_rejected() {
        assert!(is_valid_price(50000.12));
        assert!(!is_valid_price(0.0));
        assert!(!is_valid_price(-1.0));
        assert!(!is_valid_price(f64::NAN));
        assert!(!is_valid_price(f64::INFINITY));
    }

    #[test]
    fn cache_overwrites_on_new_tick() {
        let cache = PriceCache::new();
        assert!(cache.last("BTC/USD").is_none());

        cache.record("BTC/USD", 50000.0);
        cache.record("BTC/USD", 50001.5);

        assert_eq!(cache.last("BTC/USD"), Some(50001.5));
        assert!(cache.last("ETH/USD").is_none());
    }
}
