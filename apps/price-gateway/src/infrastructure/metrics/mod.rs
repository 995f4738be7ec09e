//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Upstream ticker frames received and dropped
//! - **Fan-out**: Price updates delivered to viewers, viewers pruned
//! - **Gauges**: Connected viewers and live upstream symbols
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Tick counters
    describe_counter!(
        "price_gateway_ticks_received_total",
        "Total usable ticker frames received from Kraken"
    );
    describe_counter!(
        "price_gateway_ticks_dropped_total",
        "Total ticks dropped for unusable prices"
    );

    // Fan-out counters
    describe_counter!(
        "price_gateway_updates_sent_total",
        "Total price updates delivered to viewer channels"
    );
    describe_counter!(
        "price_gateway_viewers_pruned_total",
        "Total viewers removed after a failed delivery"
    );

    // Gauges
    describe_gauge!(
        "price_gateway_viewers_connected",
        "Number of connected viewer sessions"
    );
    describe_gauge!(
        "price_gateway_live_symbols",
        "Number of symbols with at least one viewer"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a usable tick received from the upstream stream.
pub fn record_tick_received() {
    counter!("price_gateway_ticks_received_total").increment(1);
}

/// Record a tick dropped for an unusable price.
pub fn record_tick_dropped() {
    counter!("price_gateway_ticks_dropped_total").increment(1);
}

/// Record one price update delivered to a viewer channel.
pub fn record_update_sent() {
    counter!("price_gateway_updates_sent_total").increment(1);
}

/// Record a viewer pruned after a failed delivery.
pub fn record_viewer_pruned() {
    counter!("price_gateway_viewers_pruned_total").increment(1);
}

/// Update the connected viewer count.
pub fn set_viewers_connected(count: f64) {
    gauge!("price_gateway_viewers_connected").set(count);
}

/// Update the live symbol count.
pub fn set_live_symbols(count: f64) {
    gauge!("price_gateway_live_symbols").set(count);
}
