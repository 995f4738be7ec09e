//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading.
pub mod config;

/// Health check and metrics endpoints.
pub mod health;

/// Kraken WebSocket upstream adapter.
pub mod kraken;

/// Market data provider REST clients.
pub mod markets;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// HTTP server: REST endpoints and the viewer WebSocket.
pub mod server;

/// Provider symbol mapping tables.
pub mod symbols;

/// OpenTelemetry tracing integration.
pub mod telemetry;
