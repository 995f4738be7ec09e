//! Kraken Upstream Adapter
//!
//! Everything that speaks Kraken's WebSocket v2 protocol: wire types,
//! the frame codec, and the connection supervisor that owns the single
//! shared upstream socket.

pub mod codec;
pub mod messages;
pub mod supervisor;

pub use codec::{CodecError, KrakenCodec};
pub use supervisor::{
    ConnectionState, KrakenSupervisor, SharedConnectionState, SupervisorCommand, SupervisorConfig,
    SupervisorError, SupervisorHandle, supervisor_channel,
};
