//! Price Gateway Binary
//!
//! Starts the crypto market data gateway.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin price-gateway
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `CMC_API_KEY`: CoinMarketCap API key
//!
//! ## Optional
//! - `COINGECKO_API_KEY`: CoinGecko demo API key
//! - `GATEWAY_HTTP_PORT`: HTTP server port (default: 8000)
//! - `GATEWAY_ALLOWED_ORIGINS`: Comma-separated CORS origins
//! - `GATEWAY_UPSTREAM_URL`: Kraken WebSocket URL (default: wss://ws.kraken.com/v2)
//! - `GATEWAY_RECEIVE_TIMEOUT_SECS`: Upstream read timeout (default: 1)
//! - `GATEWAY_VIEWER_CHANNEL_CAPACITY`: Per-viewer channel capacity (default: 64)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: price-gateway)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use price_gateway::infrastructure::config::{GatewayConfig, log_config};
use price_gateway::infrastructure::kraken::{KrakenSupervisor, SupervisorConfig, supervisor_channel};
use price_gateway::infrastructure::markets::{CmcClient, CoinGeckoClient, KrakenRestClient};
use price_gateway::infrastructure::server::{AppState, GatewayServer};
use price_gateway::infrastructure::telemetry;
use price_gateway::{PriceCache, StreamService, SubscriptionRegistry, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    let config = GatewayConfig::from_env()?;

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init(&config.telemetry);

    tracing::info!("Starting Price Gateway");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Core fan-out state
    let registry = Arc::new(SubscriptionRegistry::new());
    let prices = Arc::new(PriceCache::new());

    // Supervisor command channel; the handle goes into the service, the
    // receiver into the supervisor task.
    let (supervisor_handle, supervisor_commands) = supervisor_channel();
    let service = Arc::new(StreamService::new(
        Arc::clone(&registry),
        Arc::clone(&prices),
        Arc::new(supervisor_handle),
    ));

    let supervisor = KrakenSupervisor::new(
        SupervisorConfig {
            url: config.stream.upstream_url.clone(),
            receive_timeout: config.stream.receive_timeout,
        },
        Arc::clone(&service),
        supervisor_commands,
        shutdown_token.clone(),
    );
    let upstream_state = supervisor.state();

    tokio::spawn(supervisor.run());

    // Market data provider clients share one HTTP connection pool
    let http = reqwest::Client::new();
    let cmc = Arc::new(CmcClient::new(
        http.clone(),
        config.keys.cmc_api_key().to_string(),
    ));
    let coingecko = Arc::new(CoinGeckoClient::new(
        http.clone(),
        config.keys.coingecko_api_key().map(str::to_string),
    ));
    let kraken_rest = Arc::new(KrakenRestClient::new(http));

    let state = Arc::new(AppState {
        service,
        cmc,
        coingecko,
        kraken_rest,
        upstream_state,
        viewer_channel_capacity: config.stream.viewer_channel_capacity,
        started_at: Instant::now(),
        next_viewer_id: AtomicU64::new(1),
    });

    let server = GatewayServer::new(config.server.clone(), state, shutdown_token.clone());
    let server_task = tokio::spawn(server.run());

    tracing::info!("Price gateway ready");

    await_shutdown(shutdown_token).await;

    if let Err(e) = server_task.await? {
        tracing::error!(error = %e, "Gateway server error");
    }

    tracing::info!("Price gateway stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
    tracing::info!("Graceful shutdown started");
}
