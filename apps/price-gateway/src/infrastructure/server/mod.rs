//! HTTP Server
//!
//! One axum server carries the whole outward surface: REST aggregation
//! endpoints, the viewer WebSocket endpoint, and the health and metrics
//! routes. CORS is restricted to the configured origins.

pub mod rest;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::services::StreamService;
use crate::infrastructure::config::ServerSettings;
use crate::infrastructure::health;
use crate::infrastructure::kraken::SharedConnectionState;
use crate::infrastructure::markets::{CmcClient, CoinGeckoClient, KrakenRestClient};

// =============================================================================
// Shared State
// =============================================================================

/// State shared by every HTTP handler.
pub struct AppState {
    /// Stream orchestration (viewer lifecycle, fan-out).
    pub service: Arc<StreamService>,
    /// CoinMarketCap client; also the currency-id resolver.
    pub cmc: Arc<CmcClient>,
    /// CoinGecko client for image enrichment.
    pub coingecko: Arc<CoinGeckoClient>,
    /// Kraken public REST client for candles.
    pub kraken_rest: Arc<KrakenRestClient>,
    /// Upstream connection state, for health reporting.
    pub upstream_state: Arc<SharedConnectionState>,
    /// Per-viewer outbound channel capacity.
    pub viewer_channel_capacity: usize,
    /// Server start time, for uptime reporting.
    pub started_at: Instant,
    /// Monotonic viewer id allocator.
    pub next_viewer_id: AtomicU64,
}

// =============================================================================
// Server
// =============================================================================

/// The gateway HTTP server.
pub struct GatewayServer {
    settings: ServerSettings,
    state: Arc<AppState>,
    cancel: CancellationToken,
}

impl GatewayServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(
        settings: ServerSettings,
        state: Arc<AppState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = build_router(&self.settings, self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.settings.http_port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.settings.http_port, e.to_string()))?;

        tracing::info!(port = self.settings.http_port, "Gateway server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

/// Assemble the full route table.
fn build_router(settings: &ServerSettings, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cryptocurrencies", get(rest::list_cryptocurrencies))
        .route("/cryptocurrencies/{currency_id}", get(rest::get_cryptocurrency))
        .route(
            "/cryptocurrencies/{currency_id}/history",
            get(rest::get_cryptocurrency_history),
        )
        .route("/ws/prices/{currency_id}", get(ws::prices_ws))
        .merge(health::routes())
        .layer(cors_layer(settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS restricted to the configured origins; credentials need explicit
/// method and header lists rather than wildcards.
fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

// =============================================================================
// Errors
// =============================================================================

/// Gateway server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
