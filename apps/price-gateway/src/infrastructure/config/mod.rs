//! Configuration Module
//!
//! Configuration loading for the gateway service.

mod settings;

pub use settings::{
    ConfigError, GatewayConfig, ProviderKeys, ServerSettings, StreamSettings, TelemetrySettings,
    log_config,
};
