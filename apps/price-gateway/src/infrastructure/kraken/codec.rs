//! Kraken Stream Codec
//!
//! Decodes inbound text frames from the Kraken v2 WebSocket into
//! [`KrakenMessage`] values. Frames the gateway does not care about decode
//! to `Ignored` rather than erroring; only malformed JSON is an error, and
//! the receive loop discards such frames without dropping the connection.

use crate::infrastructure::kraken::messages::{KrakenMessage, MethodReply, TickerFrame};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the Kraken v2 stream.
#[derive(Debug, Default, Clone)]
pub struct KrakenCodec;

impl KrakenCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound text frame.
    ///
    /// Dispatches on the `channel` field for data frames and the `method`
    /// field for control replies. Unrecognized tags are `Ignored`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or not an object.
    pub fn decode(&self, text: &str) -> Result<KrakenMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        if !value.is_object() {
            let preview: String = text.chars().take(50).collect();
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {preview}..."
            )));
        }

        if let Some(channel) = value.get("channel").and_then(|v| v.as_str()) {
            return Ok(match channel {
                "ticker" => {
                    let frame: TickerFrame = serde_json::from_value(value)?;
                    KrakenMessage::Ticker(frame)
                }
                "heartbeat" => KrakenMessage::Heartbeat,
                "status" => KrakenMessage::Status,
                _ => KrakenMessage::Ignored,
            });
        }

        if value.get("method").is_some() {
            let reply: MethodReply = serde_json::from_value(value)?;
            return Ok(KrakenMessage::MethodReply(reply));
        }

        Ok(KrakenMessage::Ignored)
    }

    /// Encode a control request to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
