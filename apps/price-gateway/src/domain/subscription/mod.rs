//! Viewer Subscription Registry
//!
//! Tracks which viewer is subscribed to which symbol, and which symbols
//! currently have at least one viewer (the live-symbol set).
//!
//! # Design
//!
//! The registry maintains two indexes that must stay consistent:
//! - viewer id -> its one subscribed symbol
//! - symbol -> the handles of every viewer subscribed to it
//!
//! A symbol is live iff its viewer set is non-empty; empty sets are removed
//! eagerly so the live set is the key set of the second index. Transitions
//! of the live set (a symbol gaining its first viewer, or losing its last)
//! are reported to the caller, which uses them to drive upstream
//! subscribe/unsubscribe traffic. The registry itself never talks upstream.
//!
//! All mutation runs under a single mutex that is never held across an
//! await point.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::pricing::ViewerMessage;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a viewer connection.
pub type ViewerId = u64;

/// A normalized upstream trading-pair identifier (e.g. `BTC/USD`).
pub type Symbol = String;

/// A viewer's identity plus its send capability.
///
/// The connection task owns the receiving half of the channel; the registry
/// holds a clone of the sender keyed by viewer id.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    id: ViewerId,
    tx: mpsc::Sender<ViewerMessage>,
}

impl ViewerHandle {
    /// Create a handle from an id and the viewer's outbound channel.
    #[must_use]
    pub const fn new(id: ViewerId, tx: mpsc::Sender<ViewerMessage>) -> Self {
        Self { id, tx }
    }

    /// The viewer's identifier.
    #[must_use]
    pub const fn id(&self) -> ViewerId {
        self.id
    }

    /// Push a message to the viewer without blocking.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if the viewer's channel is closed or full.
    /// Either condition is treated as a dead viewer by the broadcaster.
    pub fn deliver(&self, message: ViewerMessage) -> Result<(), DeliveryError> {
        self.tx
            .try_send(message)
            .map_err(|_| DeliveryError(self.id))
    }
}

/// Delivery to a viewer failed (channel closed or full).
#[derive(Debug, thiserror::Error)]
#[error("viewer {0} cannot accept messages")]
pub struct DeliveryError(pub ViewerId);

/// Live-set transitions caused by a subscribe call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOutcome {
    /// The requested symbol went from not-live to live.
    pub symbol_became_live: bool,
    /// The viewer's previous symbol lost its last viewer and needs an
    /// upstream unsubscribe.
    pub previous_symbol_emptied: Option<Symbol>,
    /// The registry held no viewers at all before this call.
    pub registry_was_empty: bool,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    viewer_symbols: HashMap<ViewerId, Symbol>,
    symbol_viewers: HashMap<Symbol, HashMap<ViewerId, ViewerHandle>>,
}

impl RegistryState {
    /// Drop the viewer's entry for `symbol`. Returns true if the symbol's
    /// viewer set became empty (and was removed).
    fn remove_from_symbol(&mut self, viewer: ViewerId, symbol: &str) -> bool {
        let Some(viewers) = self.symbol_viewers.get_mut(symbol) else {
            return false;
        };
        viewers.remove(&viewer);
        if viewers.is_empty() {
            self.symbol_viewers.remove(symbol);
            true
        } else {
            false
        }
    }
}

/// Shared registry of viewer subscriptions.
///
/// # Example
///
/// ```rust
/// use price_gateway::domain::subscription::{SubscriptionRegistry, ViewerHandle};
/// use tokio::sync::mpsc;
///
/// let registry = SubscriptionRegistry::new();
/// let (tx, _rx) = mpsc::channel(8);
///
/// let outcome = registry.subscribe(ViewerHandle::new(1, tx), "BTC/USD".to_string());
/// assert!(outcome.symbol_became_live);
/// assert!(outcome.registry_was_empty);
///
/// // Last viewer leaving vacates the symbol
/// assert_eq!(registry.unsubscribe(1).as_deref(), Some("BTC/USD"));
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    state: Mutex<RegistryState>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the viewer's interest in `symbol`, replacing any prior
    /// subscription.
    ///
    /// A viewer holds at most one subscription; requesting a different
    /// symbol tears down the old one exactly as a disconnect would, and the
    /// old symbol is reported if it emptied. Re-requesting the current
    /// symbol only refreshes the stored handle.
    pub fn subscribe(&self, handle: ViewerHandle, symbol: Symbol) -> SubscribeOutcome {
        let mut state = self.state.lock();
        let registry_was_empty = state.viewer_symbols.is_empty();

        let mut previous_symbol_emptied = None;
        if let Some(previous) = state.viewer_symbols.get(&handle.id()).cloned() {
            if previous == symbol {
                // Same symbol: refresh the handle, no live-set transition.
                if let Some(viewers) = state.symbol_viewers.get_mut(&symbol) {
                    viewers.insert(handle.id(), handle);
                }
                return SubscribeOutcome {
                    symbol_became_live: false,
                    previous_symbol_emptied: None,
                    registry_was_empty,
                };
            }
            if state.remove_from_symbol(handle.id(), &previous) {
                previous_symbol_emptied = Some(previous);
            }
        }

        let viewer = handle.id();
        let viewers = state.symbol_viewers.entry(symbol.clone()).or_default();
        let symbol_became_live = viewers.is_empty();
        viewers.insert(viewer, handle);
        state.viewer_symbols.insert(viewer, symbol);

        SubscribeOutcome {
            symbol_became_live,
            previous_symbol_emptied,
            registry_was_empty,
        }
    }

    /// Remove the viewer's subscription entirely.
    ///
    /// Returns the vacated symbol if the viewer was its last subscriber,
    /// `None` if the viewer had no subscription or other viewers remain.
    pub fn unsubscribe(&self, viewer: ViewerId) -> Option<Symbol> {
        let mut state = self.state.lock();
        let symbol = state.viewer_symbols.remove(&viewer)?;
        state
            .remove_from_symbol(viewer, &symbol)
            .then_some(symbol)
    }

    /// Point-in-time snapshot of the handles subscribed to `symbol`.
    #[must_use]
    pub fn viewers_of(&self, symbol: &str) -> Vec<ViewerHandle> {
        self.state
            .lock()
            .symbol_viewers
            .get(symbol)
            .map(|viewers| viewers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// The current live-symbol set.
    #[must_use]
    pub fn live_symbols(&self) -> Vec<Symbol> {
        self.state.lock().symbol_viewers.keys().cloned().collect()
    }

    /// Whether any viewer is subscribed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().viewer_symbols.is_empty()
    }

    /// Number of connected viewers with a subscription.
    #[must_use]
    pub fn viewer_count(&self) -> usize {
        self.state.lock().viewer_symbols.len()
    }

    /// Number of live symbols.
    #[must_use]
    pub fn live_symbol_count(&self) -> usize {
        self.state.lock().symbol_viewers.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
