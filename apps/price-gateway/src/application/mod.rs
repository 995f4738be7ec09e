//! Application Layer - Use cases and port definitions.

/// Port interfaces for upstream control and currency resolution.
pub mod ports;

/// Orchestration services (broadcast, viewer lifecycle).
pub mod services;
