//! Port Interfaces
//!
//! Contracts between the orchestration services and the adapters that
//! implement them.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`UpstreamController`]: signals to the upstream connection supervisor
//! - [`CurrencyResolver`]: external-id to ticker-symbol lookup

use async_trait::async_trait;

/// Control surface of the upstream connection supervisor.
///
/// These are signals, not direct connection operations: the supervisor task
/// exclusively owns the upstream socket and applies each signal against its
/// current state. All three are fire-and-forget and safe to call from any
/// task.
pub trait UpstreamController: Send + Sync {
    /// Ensure the upstream connection is running. No-op if it already is.
    fn start(&self);

    /// The live-symbol set changed; resubscribe with the current set
    /// (or connect first if currently disconnected).
    fn symbol_set_changed(&self);

    /// Tear the upstream connection down. Called when no viewer remains.
    fn stop(&self);
}

/// Resolves an external numeric currency id to its ticker symbol.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurrencyResolver: Send + Sync {
    /// Look up the ticker symbol (e.g. `BTC`) for a provider currency id.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the id is unknown or the provider
    /// call fails; the caller rejects the viewer connection in response.
    async fn ticker_symbol(&self, currency_id: i64) -> Result<String, ResolveError>;
}

/// Currency lookup failure, surfaced to the viewer at connect time.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The provider does not know this currency id.
    #[error("unknown currency id {0}")]
    UnknownCurrency(i64),

    /// The provider call itself failed.
    #[error("currency lookup failed: {0}")]
    Provider(String),
}

// =============================================================================
// Tests
// =============================================================================
