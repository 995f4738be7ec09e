//! Kraken WebSocket v2 Message Types
//!
//! Wire format types for the Kraken v2 ticker channel.
//!
//! # Outbound (control)
//! ```json
//! {"method": "subscribe", "params": {"channel": "ticker", "symbol": ["BTC/USD"]}}
//! {"method": "unsubscribe", "params": {"channel": "ticker", "symbol": ["BTC/USD"]}}
//! ```
//!
//! # Inbound
//! ```json
//! {"channel": "ticker", "type": "update", "data": [{"symbol": "BTC/USD", "last": 50000.12}]}
//! {"method": "subscribe", "success": true, "result": {...}}
//! {"channel": "heartbeat"}
//! ```
//!
//! # References
//!
//! - [Kraken WebSocket v2 Ticker](https://docs.kraken.com/api/docs/websocket-v2/ticker)

use serde::{Deserialize, Serialize};

// =============================================================================
// Control Requests (outbound)
// =============================================================================

/// Subscription control method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMethod {
    /// Add symbols to the ticker channel.
    Subscribe,
    /// Remove symbols from the ticker channel.
    Unsubscribe,
}

/// Parameters of a ticker-channel control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerParams {
    /// Channel name; always `ticker` for this gateway.
    pub channel: String,
    /// Full symbol list the request applies to.
    pub symbol: Vec<String>,
}

/// A subscribe or unsubscribe control frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// The control method.
    pub method: ControlMethod,
    /// Channel and symbol list.
    pub params: TickerParams,
}

impl ControlRequest {
    /// Build a ticker subscribe request for the given symbols.
    #[must_use]
    pub fn subscribe(symbols: Vec<String>) -> Self {
        Self {
            method: ControlMethod::Subscribe,
            params: TickerParams {
                channel: "ticker".to_string(),
                symbol: symbols,
            },
        }
    }

    /// Build a ticker unsubscribe request for the given symbols.
    #[must_use]
    pub fn unsubscribe(symbols: Vec<String>) -> Self {
        Self {
            method: ControlMethod::Unsubscribe,
            params: TickerParams {
                channel: "ticker".to_string(),
                symbol: symbols,
            },
        }
    }
}

// =============================================================================
// Inbound Frames
// =============================================================================

/// One ticker entry inside a snapshot or update frame.
///
/// Only the fields the gateway uses are modeled; Kraken sends many more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerEntry {
    /// Trading pair, e.g. `BTC/USD`.
    pub symbol: String,
    /// Last trade price. Absent or zero entries are dropped downstream.
    #[serde(default)]
    pub last: Option<f64>,
}

/// A ticker channel data frame (snapshot or update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerFrame {
    /// Channel name (always `ticker`).
    pub channel: String,
    /// Frame kind: `snapshot` or `update`. Both carry prices.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ticker entries, one per symbol.
    #[serde(default)]
    pub data: Vec<TickerEntry>,
}

/// Reply to a control request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodReply {
    /// Echoed method name.
    pub method: String,
    /// Whether the request was accepted.
    #[serde(default)]
    pub success: Option<bool>,
    /// Error description when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

impl MethodReply {
    /// Whether this reply reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.success == Some(false)
    }
}

/// Any decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum KrakenMessage {
    /// Ticker data carrying `(symbol, last price)` entries.
    Ticker(TickerFrame),
    /// Reply to a subscribe/unsubscribe request.
    MethodReply(MethodReply),
    /// Channel heartbeat; ignored.
    Heartbeat,
    /// Connection status announcement; ignored.
    Status,
    /// Any other tagged frame; ignored.
    Ignored,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_request_wire_format() {
        let request = ControlRequest::subscribe(vec!["BTC/USD".to_string()]);
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"method":"subscribe","params":{"channel":"ticker","symbol":["BTC/USD"]}}"#
        );
    }

    #[test]
    fn unsubscribe_request_wire_format() {
        let request =
            ControlRequest::unsubscribe(vec!["BTC/USD".to_string(), "ETH/USD".to_string()]);
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"method":"unsubscribe","params":{"channel":"ticker","symbol":["BTC/USD","ETH/USD"]}}"#
        );
    }

    #[test]
    fn ticker_frame_parses_update() {
        let json = r#"{"channel":"ticker","type":"update","data":[{"symbol":"BTC/USD","last":50000.12,"volume":123.4}]}"#;
        let frame: TickerFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.kind, "update");
        assert_eq!(frame.data.len(), 1);
        assert_eq!(frame.data[0].symbol, "BTC/USD");
        assert_eq!(frame.data[0].last, Some(50000.12));
    }

    #[test]
    fn ticker_entry_tolerates_missing_last() {
        let json = r#"{"symbol":"BTC/USD"}"#;
        let entry: TickerEntry = serde_json::from_str(json).unwrap();
        assert!(entry.last.is_none());
    }

    #[test]
    fn method_reply_error_detection() {
        let ok: MethodReply =
            serde_json::from_str(r#"{"method":"subscribe","success":true}"#).unwrap();
        assert!(!ok.is_error());

        let failed: MethodReply = serde_json::from_str(
            r#"{"method":"subscribe","success":false,"error":"Currency pair not supported"}"#,
        )
        .unwrap();
        assert!(failed.is_error());
        assert!(failed.error.is_some());
    }
}
