//! Gateway Configuration Settings
//!
//! Configuration types for the price gateway, loaded from environment
//! variables.

use std::time::Duration;

/// Market data provider API keys.
#[derive(Clone)]
pub struct ProviderKeys {
    cmc_api_key: String,
    coingecko_api_key: Option<String>,
}

impl ProviderKeys {
    /// Create new provider keys.
    #[must_use]
    pub const fn new(cmc_api_key: String, coingecko_api_key: Option<String>) -> Self {
        Self {
            cmc_api_key,
            coingecko_api_key,
        }
    }

    /// Get the CoinMarketCap API key.
    #[must_use]
    pub fn cmc_api_key(&self) -> &str {
        &self.cmc_api_key
    }

    /// Get the optional CoinGecko demo API key.
    #[must_use]
    pub fn coingecko_api_key(&self) -> Option<&str> {
        self.coingecko_api_key.as_deref()
    }
}

impl std::fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("cmc_api_key", &"[REDACTED]")
            .field(
                "coingecko_api_key",
                &self.coingecko_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port the REST and viewer WebSocket server binds to.
    pub http_port: u16,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 8000,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

/// Upstream stream and viewer channel settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Kraken WebSocket v2 URL.
    pub upstream_url: String,
    /// Bounded wait for one upstream frame before re-checking signals.
    pub receive_timeout: Duration,
    /// Per-viewer outbound channel capacity.
    pub viewer_channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            upstream_url: "wss://ws.kraken.com/v2".to_string(),
            receive_timeout: Duration::from_secs(1),
            viewer_channel_capacity: 64,
        }
    }
}

/// Tracing and OTLP export settings.
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Whether spans are exported over OTLP.
    pub otel_enabled: bool,
    /// OTLP collector endpoint.
    pub otlp_endpoint: String,
    /// Service name attached to exported spans.
    pub service_name: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            otel_enabled: true,
            otlp_endpoint: "http://localhost:4318".to_string(),
            service_name: "price-gateway".to_string(),
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Provider API keys.
    pub keys: ProviderKeys,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Upstream stream settings.
    pub stream: StreamSettings,
    /// Tracing and export settings.
    pub telemetry: TelemetrySettings,
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `CMC_API_KEY` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cmc_api_key = std::env::var("CMC_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("CMC_API_KEY".to_string()))?;
        if cmc_api_key.is_empty() {
            return Err(ConfigError::EmptyValue("CMC_API_KEY".to_string()));
        }

        let coingecko_api_key = std::env::var("COINGECKO_API_KEY")
            .ok()
            .filter(|v| !v.is_empty());

        let server = ServerSettings {
            http_port: parse_env_u16("GATEWAY_HTTP_PORT", ServerSettings::default().http_port),
            allowed_origins: parse_env_list(
                "GATEWAY_ALLOWED_ORIGINS",
                ServerSettings::default().allowed_origins,
            ),
        };

        let stream = StreamSettings {
            upstream_url: std::env::var("GATEWAY_UPSTREAM_URL")
                .unwrap_or_else(|_| StreamSettings::default().upstream_url),
            receive_timeout: parse_env_duration_secs(
                "GATEWAY_RECEIVE_TIMEOUT_SECS",
                StreamSettings::default().receive_timeout,
            ),
            viewer_channel_capacity: parse_env_usize(
                "GATEWAY_VIEWER_CHANNEL_CAPACITY",
                StreamSettings::default().viewer_channel_capacity,
            ),
        };

        let telemetry = TelemetrySettings {
            otel_enabled: std::env::var("OTEL_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| TelemetrySettings::default().otlp_endpoint),
            service_name: std::env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| TelemetrySettings::default().service_name),
        };

        Ok(Self {
            keys: ProviderKeys::new(cmc_api_key, coingecko_api_key),
            server,
            stream,
            telemetry,
        })
    }
}

/// Log the effective configuration at startup, secrets redacted.
pub fn log_config(config: &GatewayConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        allowed_origins = ?config.server.allowed_origins,
        upstream_url = %config.stream.upstream_url,
        receive_timeout_secs = config.stream.receive_timeout.as_secs(),
        viewer_channel_capacity = config.stream.viewer_channel_capacity,
        otel_enabled = config.telemetry.otel_enabled,
        coingecko_key = config.keys.coingecko_api_key().is_some(),
        "Gateway configuration loaded"
    );
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_list(key: &str, default: Vec<String>) -> Vec<String> {
    std::env::var(key).map_or(default, |v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_keys_redacted_debug() {
        let keys = ProviderKeys::new("cmc123".to_string(), Some("gecko456".to_string()));
        let debug = format!("{keys:?}");
        assert!(!debug.contains("cmc123"));
        assert!(!debug.contains("gecko456"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn server_settings_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.http_port, 8000);
        assert_eq!(settings.allowed_origins.len(), 2);
    }

    #[test]
    fn stream_settings_defaults() {
        let settings = StreamSettings::default();
        assert_eq!(settings.upstream_url, "wss://ws.kraken.com/v2");
        assert_eq!(settings.receive_timeout, Duration::from_secs(1));
        assert_eq!(settings.viewer_channel_capacity, 64);
    }

    #[test]
    fn telemetry_settings_defaults() {
        let settings = TelemetrySettings::default();
        assert!(settings.otel_enabled);
        assert_eq!(settings.otlp_endpoint, "http://localhost:4318");
        assert_eq!(settings.service_name, "price-gateway");
    }

    #[test]
    fn origin_list_parsing() {
        let parsed = parse_env_list("GATEWAY_TEST_UNSET_ORIGINS", vec!["a".to_string()]);
        assert_eq!(parsed, vec!["a".to_string()]);
    }
}
