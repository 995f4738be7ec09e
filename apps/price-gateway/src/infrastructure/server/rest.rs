//! REST Aggregation Endpoints
//!
//! Listings, per-currency detail with image enrichment, and OHLC history.
//! Provider failures surface as a JSON `{"detail": ...}` error body.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infrastructure::markets::{Candle, MarketError};
use crate::infrastructure::server::AppState;
use crate::infrastructure::symbols;

/// Kraken's supported OHLC intervals, in minutes.
const VALID_INTERVALS: &[u32] = &[1, 5, 15, 30, 60, 240, 1440, 10_080, 21_600];

// =============================================================================
// Error Body
// =============================================================================

/// A REST error with a JSON `detail` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

impl From<MarketError> for ApiError {
    fn from(error: MarketError) -> Self {
        let status = match &error {
            // An id the provider does not know manifests as absent data.
            MarketError::MissingData(_) => StatusCode::NOT_FOUND,
            MarketError::Http(_) | MarketError::Provider(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, error.to_string())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /cryptocurrencies` - top cryptocurrencies by market cap.
pub async fn list_cryptocurrencies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let listings = state.cmc.listings().await?;
    Ok(Json(listings))
}

/// `GET /cryptocurrencies/{currency_id}` - detail for one currency,
/// enriched with CoinGecko image URLs when available.
pub async fn get_cryptocurrency(
    State(state): State<Arc<AppState>>,
    Path(currency_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut detail = state.cmc.currency(currency_id).await?;

    // Image enrichment is best-effort; a CoinGecko failure leaves the
    // CoinMarketCap payload as-is.
    let name = detail.get("name").and_then(Value::as_str).unwrap_or("");
    let ticker = detail.get("symbol").and_then(Value::as_str).unwrap_or("");
    let coin_id = symbols::coingecko_id(name, ticker);

    match state.coingecko.coin_image(&coin_id).await {
        Ok(image) => {
            if let Some(object) = detail.as_object_mut()
                && let Ok(value) = serde_json::to_value(image)
            {
                object.insert("coingecko_image".to_string(), value);
            }
        }
        Err(e) => {
            tracing::warn!(coin_id = %coin_id, error = %e, "Failed to fetch CoinGecko image");
        }
    }

    Ok(Json(detail))
}

/// History endpoint query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Candle interval in minutes.
    #[serde(default = "default_interval")]
    pub interval: u32,
}

const fn default_interval() -> u32 {
    60
}

/// History endpoint response body.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// The currency's ticker.
    pub symbol: String,
    /// The Kraken REST pair the candles came from.
    pub kraken_pair: String,
    /// Candle interval in minutes.
    pub interval: u32,
    /// `[ts_ms, open, high, low, close]` candles, oldest first.
    pub data: Vec<Candle>,
}

/// `GET /cryptocurrencies/{currency_id}/history` - OHLC candles.
pub async fn get_cryptocurrency_history(
    State(state): State<Arc<AppState>>,
    Path(currency_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    if !VALID_INTERVALS.contains(&query.interval) {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "invalid interval {}; expected one of {VALID_INTERVALS:?}",
                query.interval
            ),
        ));
    }

    let detail = state.cmc.currency(currency_id).await?;
    let symbol = detail
        .get("symbol")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("currency {currency_id} has no symbol"),
            )
        })?
        .to_string();

    let kraken_pair = symbols::kraken_ohlc_pair(&symbol);
    let data = state
        .kraken_rest
        .ohlc(&kraken_pair, query.interval)
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::BAD_GATEWAY,
                format!("Failed to fetch historical data: {e}"),
            )
        })?;

    Ok(Json(HistoryResponse {
        symbol,
        kraken_pair,
        interval: query.interval,
        data,
    }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_query_defaults_to_one_hour() {
        let query: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.interval, 60);
    }

    #[test]
    fn history_response_shape() {
        let response = HistoryResponse {
            symbol: "BTC".to_string(),
            kraken_pair: "XXBTZUSD".to_string(),
            interval: 60,
            data: vec![Candle(100_000, 1.0, 2.0, 0.5, 1.5)],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["symbol"], "BTC");
        assert_eq!(json["kraken_pair"], "XXBTZUSD");
        assert_eq!(json["data"][0][0], 100_000);
    }

    #[test]
    fn error_body_uses_detail_field() {
        let error = ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn interval_validation_table() {
        assert!(VALID_INTERVALS.contains(&60));
        assert!(VALID_INTERVALS.contains(&1440));
        assert!(!VALID_INTERVALS.contains(&7));
    }
}
