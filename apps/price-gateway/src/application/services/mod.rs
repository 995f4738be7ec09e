//! Stream Service
//!
//! Orchestrates the subscription registry, the price cache, and the
//! upstream supervisor: viewer connect/disconnect cascades, and the
//! broadcast of inbound ticks to the viewers subscribed to each symbol.

use std::sync::Arc;

use crate::application::ports::UpstreamController;
use crate::domain::pricing::{PriceCache, ViewerMessage, is_valid_price};
use crate::domain::subscription::{Symbol, SubscriptionRegistry, ViewerHandle, ViewerId};
use crate::infrastructure::metrics;
use crate::infrastructure::symbols;

/// Fan-out and viewer lifecycle orchestration.
///
/// Shared by the viewer connection tasks (connect/disconnect) and the
/// supervisor's receive loop (publish). All registry access goes through
/// [`SubscriptionRegistry`]'s internal lock; this service holds no mutable
/// state of its own.
pub struct StreamService {
    registry: Arc<SubscriptionRegistry>,
    prices: Arc<PriceCache>,
    upstream: Arc<dyn UpstreamController>,
}

impl StreamService {
    /// Wire the service to its collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        prices: Arc<PriceCache>,
        upstream: Arc<dyn UpstreamController>,
    ) -> Self {
        Self {
            registry,
            prices,
            upstream,
        }
    }

    /// The shared subscription registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// The shared last-known-price cache.
    #[must_use]
    pub const fn prices(&self) -> &Arc<PriceCache> {
        &self.prices
    }

    /// Deliver a tick to every viewer of `symbol`, pruning dead viewers.
    ///
    /// Zero or non-finite prices are dropped without caching or delivery.
    /// Each delivery is independent: one failed viewer never blocks the
    /// others. A viewer whose channel is closed or full is unsubscribed on
    /// the spot, and if that vacated its symbol the upstream set is updated
    /// exactly as on an explicit disconnect.
    pub fn publish(&self, symbol: &str, price: f64) {
        if !is_valid_price(price) {
            tracing::debug!(symbol, price, "Dropping tick with unusable price");
            metrics::record_tick_dropped();
            return;
        }

        self.prices.record(symbol, price);
        metrics::record_tick_received();

        let mut pruned = Vec::new();
        for viewer in self.registry.viewers_of(symbol) {
            match viewer.deliver(ViewerMessage::price_update(symbol, price)) {
                Ok(()) => metrics::record_update_sent(),
                Err(failure) => pruned.push(failure.0),
            }
        }

        for viewer in pruned {
            tracing::info!(viewer, symbol, "Pruning viewer after failed delivery");
            metrics::record_viewer_pruned();
            self.drop_viewer(viewer);
        }
        self.update_gauges();
    }

    /// Register a new viewer requesting `ticker` (caller-facing symbol).
    ///
    /// Maps the ticker to the upstream pair, records the subscription,
    /// signals the supervisor on live-set transitions, and pushes the
    /// cached last-known price to the viewer when one exists. Returns the
    /// upstream pair the viewer is now subscribed to.
    pub fn on_viewer_connect(&self, handle: ViewerHandle, ticker: &str) -> Symbol {
        let pair = symbols::kraken_ws_pair(ticker);
        let viewer = handle.id();

        // Snapshot delivery can race the first tick; at-most-once per tick
        // still holds because the snapshot is a distinct message.
        if let Some(price) = self.prices.last(&pair) {
            let _ = handle.deliver(ViewerMessage::price_update(&pair, price));
        }

        let outcome = self.registry.subscribe(handle, pair.clone());
        tracing::info!(
            viewer,
            symbol = %pair,
            total = self.registry.viewer_count(),
            "Viewer connected"
        );

        if outcome.symbol_became_live || outcome.previous_symbol_emptied.is_some() {
            if outcome.registry_was_empty {
                self.upstream.start();
            } else {
                self.upstream.symbol_set_changed();
            }
        }
        self.update_gauges();
        pair
    }

    /// Tear down a viewer's subscription after its connection ended.
    pub fn on_viewer_disconnect(&self, viewer: ViewerId) {
        self.drop_viewer(viewer);
        tracing::info!(viewer, total = self.registry.viewer_count(), "Viewer disconnected");
        self.update_gauges();
    }

    /// Shared teardown for explicit disconnects and delivery-failure pruning.
    fn drop_viewer(&self, viewer: ViewerId) {
        if let Some(vacated) = self.registry.unsubscribe(viewer) {
            if self.registry.is_empty() {
                tracing::info!(symbol = %vacated, "Last viewer gone, stopping upstream");
                self.upstream.stop();
            } else {
                tracing::info!(symbol = %vacated, "Symbol vacated, updating upstream set");
                self.upstream.symbol_set_changed();
            }
        }
    }

    fn update_gauges(&self) {
        metrics::set_viewers_connected(self.registry.viewer_count() as f64);
        metrics::set_live_symbols(self.registry.live_symbol_count() as f64);
    }
}

// =============================================================================
// Tests
// =============================================================================
