//! Tracing and OTLP Export
//!
//! Installs the global `tracing` subscriber: a fmt layer for stdout plus,
//! when enabled in [`TelemetrySettings`], an OpenTelemetry layer exporting
//! spans over OTLP. Settings come from [`GatewayConfig::from_env`].
//!
//! [`GatewayConfig::from_env`]: crate::infrastructure::config::GatewayConfig::from_env

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::infrastructure::config::TelemetrySettings;

/// Per-crate default log directives, overridable through `RUST_LOG`.
const LOG_DIRECTIVES: [&str; 4] = [
    "price_gateway=info",
    "tower_http=info",
    "tungstenite=warn",
    "hyper=warn",
];

/// Shuts the OTLP pipeline down when dropped.
///
/// Keep this alive for the lifetime of the program; dropping it flushes
/// any buffered spans.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shutdown OpenTelemetry tracer provider: {e}");
        }
    }
}

/// Install the global subscriber.
///
/// With OTLP disabled only the fmt layer is active and the returned guard
/// owns no exporter.
#[must_use]
#[allow(clippy::expect_used)]
pub fn init(settings: &TelemetrySettings) -> TelemetryGuard {
    let mut env_filter = EnvFilter::from_default_env();
    for directive in LOG_DIRECTIVES {
        env_filter =
            env_filter.add_directive(directive.parse().expect("static log directive is valid"));
    }

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let (otel_layer, tracer_provider) = if settings.otel_enabled {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&settings.otlp_endpoint)
            .build()
            .expect("Failed to create OTLP exporter");

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(
                opentelemetry_sdk::Resource::builder()
                    .with_service_name(settings.service_name.clone())
                    .build(),
            )
            .build();

        let tracer = provider.tracer(settings.service_name.clone());
        (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(provider),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    TelemetryGuard { tracer_provider }
}

// =============================================================================
// Tests
// =============================================================================
