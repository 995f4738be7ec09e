//! Domain Layer - Core subscription and pricing types.
//!
//! This layer contains the bookkeeping structures for viewer subscriptions
//! and live prices. No network or protocol code lives here.

/// Price update types and the last-known-price cache.
pub mod pricing;

/// Viewer subscription tracking and the live-symbol set.
pub mod subscription;
