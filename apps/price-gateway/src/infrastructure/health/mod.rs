//! Health Check and Metrics Endpoint
//!
//! Health, probe, and Prometheus metrics routes, served from the main
//! gateway server.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe
//! - `GET /metrics` - Prometheus metrics in text format

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::infrastructure::kraken::ConnectionState;
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::server::AppState;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded".
    pub status: HealthStatus,
    /// Gateway version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream stream status.
    pub upstream: UpstreamStatus,
    /// Viewer statistics.
    pub viewers: ViewerStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Streaming matches demand: either idle, or connected and listening.
    Healthy,
    /// Viewers are waiting but the upstream stream is not listening.
    Degraded,
}

/// Upstream stream status.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamStatus {
    /// Connection state name.
    pub state: String,
    /// Whether ticker frames are flowing.
    pub listening: bool,
}

/// Viewer statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerStatus {
    /// Connected viewer sessions.
    pub connected: usize,
    /// Symbols with at least one viewer.
    pub live_symbols: usize,
}

// =============================================================================
// Routes
// =============================================================================

/// Health and metrics routes, to merge into the gateway router.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    (StatusCode::OK, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler() -> impl IntoResponse {
    // The REST surface works regardless of upstream demand, so serving
    // traffic at all means ready.
    (StatusCode::OK, "READY")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let upstream_state = state.upstream_state.get();
    let viewers = state.service.registry().viewer_count();
    let live_symbols = state.service.registry().live_symbol_count();

    let listening = upstream_state == ConnectionState::Listening;
    let status = determine_health_status(viewers, listening);

    HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        upstream: UpstreamStatus {
            state: upstream_state.as_str().to_string(),
            listening,
        },
        viewers: ViewerStatus {
            connected: viewers,
            live_symbols,
        },
    }
}

/// Idle is healthy: the upstream connection only exists on demand.
const fn determine_health_status(viewers: usize, listening: bool) -> HealthStatus {
    if viewers == 0 || listening {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

// =============================================================================
// Tests
// =============================================================================
