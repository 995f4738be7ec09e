#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Price Gateway - Crypto Market Data Multiplexer
//!
//! An HTTP gateway that maintains a single connection to Kraken's v2
//! ticker stream and multiplexes live prices to many viewer WebSocket
//! connections, alongside REST aggregation endpoints for listings,
//! quotes, and OHLC candles.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core fan-out logic and data types
//!   - `pricing`: Viewer wire messages, price validation, last-price cache
//!   - `subscription`: The viewer/symbol subscription registry
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Upstream control and currency resolution interfaces
//!   - `services`: Stream orchestration (connect, disconnect, publish)
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `kraken`: WebSocket upstream supervisor and wire codec
//!   - `markets`: CoinMarketCap, CoinGecko, and Kraken REST clients
//!   - `server`: axum REST + viewer WebSocket server
//!   - `symbols`: Provider symbol mapping tables
//!   - `config`, `health`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//!                      ┌──────────────┐     ┌─────────────┐
//! Kraken v2 WS ───────►│  Supervisor  │────►│   Stream    │──► Viewer 1
//!   (one connection)   │  (publish)   │     │   Service   │──► Viewer 2
//!                      └──────────────┘     └─────────────┘──► Viewer N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core fan-out types with no external integrations.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::pricing::{PriceCache, ViewerMessage, is_valid_price};
pub use domain::subscription::{
    SubscribeOutcome, SubscriptionRegistry, Symbol, ViewerHandle, ViewerId,
};

// Application layer
pub use application::ports::{CurrencyResolver, ResolveError, UpstreamController};
pub use application::services::StreamService;

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, GatewayConfig, ServerSettings, StreamSettings, TelemetrySettings,
};

// Upstream supervisor (for integration tests)
pub use infrastructure::kraken::{
    ConnectionState, KrakenSupervisor, SupervisorConfig, SupervisorHandle, supervisor_channel,
};

// HTTP server
pub use infrastructure::server::{AppState, GatewayServer, ServerError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryGuard, init as init_telemetry};
