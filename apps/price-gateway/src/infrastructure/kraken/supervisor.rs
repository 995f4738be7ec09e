//! Upstream Connection Supervisor
//!
//! Owns the single WebSocket connection to Kraken's v2 ticker stream and
//! runs its lifecycle: connect, subscribe, receive loop, demand-driven
//! restart. No other component touches the upstream socket; callers send
//! signals through a [`SupervisorHandle`].
//!
//! # State machine
//!
//! `Disconnected -> Connecting -> Subscribed -> Listening -> Disconnected`
//!
//! The supervisor is `Disconnected` exactly when no viewer wants data.
//! A transport failure also lands in `Disconnected`, and the supervisor
//! does **not** retry on its own: the next start/resubscribe signal that
//! arrives while viewers exist reconnects it. This keeps the connection
//! strictly demand-driven.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::application::ports::UpstreamController;
use crate::application::services::StreamService;
use crate::domain::subscription::Symbol;
use crate::infrastructure::kraken::codec::{CodecError, KrakenCodec};
use crate::infrastructure::kraken::messages::{ControlRequest, KrakenMessage};

// =============================================================================
// Errors
// =============================================================================

/// Errors that end one upstream connection.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Control frame could not be serialized.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The server rejected a control request.
    #[error("upstream rejected request: {0}")]
    Rejected(String),

    /// The server closed the connection.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Connection State
// =============================================================================

/// Supervisor connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No upstream connection; the live-symbol set is (or was) empty.
    Disconnected = 0,
    /// Connection attempt in flight.
    Connecting = 1,
    /// Connected, initial subscribe sent.
    Subscribed = 2,
    /// Receiving ticker frames.
    Listening = 3,
}

impl ConnectionState {
    /// Lowercase name for health reporting.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Listening => "listening",
        }
    }
}

/// Connection state readable from other tasks (health endpoint).
#[derive(Debug, Default)]
pub struct SharedConnectionState(AtomicU8);

impl SharedConnectionState {
    /// Create a state cell starting at `Disconnected`.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected as u8))
    }

    fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Read the current state.
    #[must_use]
    pub fn get(&self) -> ConnectionState {
        match self.0.load(Ordering::SeqCst) {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Subscribed,
            3 => ConnectionState::Listening,
            _ => ConnectionState::Disconnected,
        }
    }
}

// =============================================================================
// Commands and Handle
// =============================================================================

/// Signals accepted by the supervisor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorCommand {
    /// Ensure the connection is running.
    Start,
    /// The live-symbol set changed; resubscribe (or connect).
    SymbolSetChanged,
    /// Tear the connection down.
    Stop,
}

/// Cloneable sending side of the supervisor's command channel.
///
/// All commands funnel through one receiver owned by the supervisor task,
/// so concurrent callers serialize and `Start` is naturally idempotent.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    tx: mpsc::UnboundedSender<SupervisorCommand>,
}

impl SupervisorHandle {
    fn send(&self, command: SupervisorCommand) {
        // A closed channel means the supervisor task is shutting down;
        // there is nothing useful left to signal.
        if self.tx.send(command).is_err() {
            tracing::debug!(?command, "Supervisor command dropped (task stopped)");
        }
    }
}

impl UpstreamController for SupervisorHandle {
    fn start(&self) {
        self.send(SupervisorCommand::Start);
    }

    fn symbol_set_changed(&self) {
        self.send(SupervisorCommand::SymbolSetChanged);
    }

    fn stop(&self) {
        self.send(SupervisorCommand::Stop);
    }
}

/// Create the command channel for a supervisor.
#[must_use]
pub fn supervisor_channel() -> (SupervisorHandle, mpsc::UnboundedReceiver<SupervisorCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SupervisorHandle { tx }, rx)
}

// =============================================================================
// Configuration
// =============================================================================

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Upstream WebSocket URL.
    pub url: String,
    /// Bounded wait for one upstream frame before re-checking signals.
    pub receive_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            url: "wss://ws.kraken.com/v2".to_string(),
            receive_timeout: Duration::from_secs(1),
        }
    }
}

// =============================================================================
// Supervisor
// =============================================================================

/// The upstream connection supervisor task.
pub struct KrakenSupervisor {
    config: SupervisorConfig,
    codec: KrakenCodec,
    service: Arc<StreamService>,
    commands: mpsc::UnboundedReceiver<SupervisorCommand>,
    state: Arc<SharedConnectionState>,
    cancel: CancellationToken,
}

impl KrakenSupervisor {
    /// Create a supervisor from its config, service, and command receiver.
    #[must_use]
    pub fn new(
        config: SupervisorConfig,
        service: Arc<StreamService>,
        commands: mpsc::UnboundedReceiver<SupervisorCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: KrakenCodec::new(),
            service,
            commands,
            state: Arc::new(SharedConnectionState::new()),
            cancel,
        }
    }

    /// Shared view of the connection state, for health reporting.
    #[must_use]
    pub fn state(&self) -> Arc<SharedConnectionState> {
        Arc::clone(&self.state)
    }

    /// Run the supervisor until cancelled.
    ///
    /// While `Disconnected` it only waits for commands; `Start` and
    /// `SymbolSetChanged` open a connection when viewers exist, and each
    /// connection runs until stop, failure, or cancellation.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Supervisor cancelled");
                    return;
                }
                command = self.commands.recv() => {
                    match command {
                        None => return,
                        Some(SupervisorCommand::Stop) => {
                            // Already disconnected.
                        }
                        Some(SupervisorCommand::Start | SupervisorCommand::SymbolSetChanged) => {
                            if self.service.registry().is_empty() {
                                tracing::debug!("Ignoring start signal with no live symbols");
                                continue;
                            }
                            if let Err(e) = self.run_connection().await {
                                tracing::warn!(error = %e, "Upstream connection ended");
                            }
                            self.state.set(ConnectionState::Disconnected);
                        }
                    }
                }
            }
        }
    }

    /// One connection lifetime: connect, subscribe, listen.
    async fn run_connection(&mut self) -> Result<(), SupervisorError> {
        self.state.set(ConnectionState::Connecting);
        tracing::info!(url = %self.config.url, "Connecting to Kraken ticker stream");

        let (ws_stream, _response) =
            tokio_tungstenite::connect_async(self.config.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        self.state.set(ConnectionState::Subscribed);

        // The registry, not any caller's request, is the source of truth
        // for the initial subscribe list.
        let mut subscribed = self.live_symbols_sorted();
        if subscribed.is_empty() {
            // All viewers left between the start signal and the connect.
            let _ = write.send(Message::Close(None)).await;
            return Ok(());
        }
        let subscribe = ControlRequest::subscribe(subscribed.clone());
        write
            .send(Message::Text(self.codec.encode(&subscribe)?.into()))
            .await?;
        tracing::info!(symbols = ?subscribed, "Subscribed to Kraken ticker");

        self.state.set(ConnectionState::Listening);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                command = self.commands.recv() => {
                    match command {
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                        Some(SupervisorCommand::Start) => {
                            // Already running.
                        }
                        Some(SupervisorCommand::Stop) => {
                            tracing::info!("Stopping upstream connection");
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                        Some(SupervisorCommand::SymbolSetChanged) => {
                            let current = self.live_symbols_sorted();
                            if current.is_empty() {
                                // Raced with the last disconnect; the Stop
                                // command is right behind.
                                continue;
                            }
                            self.resubscribe(&mut write, &subscribed, &current).await?;
                            subscribed = current;
                        }
                    }
                }
                frame = tokio::time::timeout(self.config.receive_timeout, read.next()) => {
                    match frame {
                        Err(_elapsed) => {
                            // Bounded wait; loop around to re-check signals.
                        }
                        Ok(None) => {
                            tracing::warn!("Upstream stream ended");
                            return Err(SupervisorError::ConnectionClosed);
                        }
                        Ok(Some(Err(e))) => return Err(e.into()),
                        Ok(Some(Ok(Message::Text(text)))) => {
                            self.handle_frame(&text)?;
                        }
                        Ok(Some(Ok(Message::Ping(data)))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Ok(Some(Ok(Message::Close(_)))) => {
                            tracing::info!("Server sent close frame");
                            return Err(SupervisorError::ConnectionClosed);
                        }
                        Ok(Some(Ok(_))) => {
                            // Ignore other frame types.
                        }
                    }
                }
            }
        }
    }

    /// Clear the stale symbol set, then subscribe the fresh one.
    ///
    /// A no-op when the sorted sets are equal. Unsubscribing the full old
    /// list before subscribing the new one avoids duplicate pushes for
    /// symbols present in both.
    async fn resubscribe<W>(
        &self,
        write: &mut W,
        stale: &[Symbol],
        fresh: &[Symbol],
    ) -> Result<(), SupervisorError>
    where
        W: SinkExt<Message> + Unpin,
        SupervisorError: From<W::Error>,
    {
        if stale == fresh {
            return Ok(());
        }

        let unsubscribe = ControlRequest::unsubscribe(stale.to_vec());
        write
            .send(Message::Text(self.codec.encode(&unsubscribe)?.into()))
            .await?;

        let subscribe = ControlRequest::subscribe(fresh.to_vec());
        write
            .send(Message::Text(self.codec.encode(&subscribe)?.into()))
            .await?;

        tracing::info!(symbols = ?fresh, "Resubscribed to Kraken ticker");
        Ok(())
    }

    /// Decode one frame and fan out its ticks.
    ///
    /// Malformed frames are discarded without ending the connection;
    /// an upstream error reply is a connection failure.
    fn handle_frame(&self, text: &str) -> Result<(), SupervisorError> {
        let message = match self.codec.decode(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding malformed upstream frame");
                return Ok(());
            }
        };

        match message {
            KrakenMessage::Ticker(frame) => {
                for entry in frame.data {
                    if let Some(last) = entry.last {
                        self.service.publish(&entry.symbol, last);
                    }
                }
                Ok(())
            }
            KrakenMessage::MethodReply(reply) if reply.is_error() => {
                let detail = reply.error.unwrap_or_else(|| "unknown error".to_string());
                tracing::error!(error = %detail, "Upstream rejected control request");
                Err(SupervisorError::Rejected(detail))
            }
            KrakenMessage::MethodReply(reply) => {
                tracing::debug!(method = %reply.method, "Control request acknowledged");
                Ok(())
            }
            KrakenMessage::Heartbeat | KrakenMessage::Status | KrakenMessage::Ignored => Ok(()),
        }
    }

    fn live_symbols_sorted(&self) -> Vec<Symbol> {
        let mut symbols = self.service.registry().live_symbols();
        symbols.sort_unstable();
        symbols
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures_util::Sink;
    use serde_json::Value;

    use super::*;
    use crate::domain::pricing::PriceCache;
    use crate::domain::subscription::SubscriptionRegistry;

    /// Captures outbound text frames instead of writing to a socket.
    #[derive(Default)]
    struct FrameSink {
        frames: Vec<String>,
    }

    impl Sink<Message> for FrameSink {
        type Error = tokio_tungstenite::tungstenite::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
            if let Message::Text(text) = item {
                self.get_mut().frames.push(text.to_string());
            }
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    fn test_supervisor() -> KrakenSupervisor {
        let (handle, commands) = supervisor_channel();
        let service = Arc::new(StreamService::new(
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(PriceCache::new()),
            Arc::new(handle),
        ));
        KrakenSupervisor::new(
            SupervisorConfig::default(),
            service,
            commands,
            CancellationToken::new(),
        )
    }

    /// Extract the method and symbol list from an outbound control frame.
    fn control_frame(frame: &str) -> (String, Vec<String>) {
        let value: Value = serde_json::from_str(frame).unwrap();
        let method = value["method"].as_str().unwrap().to_string();
        let symbols = value["params"]["symbol"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap().to_string())
            .collect();
        (method, symbols)
    }

    #[tokio::test]
    async fn resubscribe_clears_stale_set_before_subscribing_fresh() {
        let supervisor = test_supervisor();
        let mut sink = FrameSink::default();

        let stale = vec!["BTC/USD".to_string(), "ETH/USD".to_string()];
        let fresh = vec!["ETH/USD".to_string(), "SOL/USD".to_string()];
        supervisor
            .resubscribe(&mut sink, &stale, &fresh)
            .await
            .unwrap();

        assert_eq!(sink.frames.len(), 2);
        assert_eq!(
            control_frame(&sink.frames[0]),
            ("unsubscribe".to_string(), stale)
        );
        assert_eq!(
            control_frame(&sink.frames[1]),
            ("subscribe".to_string(), fresh)
        );
    }

    #[tokio::test]
    async fn resubscribe_with_unchanged_set_sends_nothing() {
        let supervisor = test_supervisor();
        let mut sink = FrameSink::default();

        let set = vec!["BTC/USD".to_string(), "ETH/USD".to_string()];
        supervisor
            .resubscribe(&mut sink, &set, &set.clone())
            .await
            .unwrap();

        assert!(sink.frames.is_empty());
    }

    #[test]
    fn shared_state_round_trips() {
        let state = SharedConnectionState::new();
        assert_eq!(state.get(), ConnectionState::Disconnected);

        state.set(ConnectionState::Listening);
        assert_eq!(state.get(), ConnectionState::Listening);
        assert_eq!(state.get().as_str(), "listening");
    }

    #[test]
    fn handle_is_silent_after_task_exit() {
        let (handle, rx) = supervisor_channel();
        drop(rx);

        // Must not panic or error outward.
        handle.start();
        handle.symbol_set_changed();
        handle.stop();
    }

    #[tokio::test]
    async fn commands_arrive_in_order() {
        let (handle, mut rx) = supervisor_channel();

        handle.start();
        handle.symbol_set_changed();
        handle.stop();

        assert_eq!(rx.recv().await, Some(SupervisorCommand::Start));
        assert_eq!(rx.recv().await, Some(SupervisorCommand::SymbolSetChanged));
        assert_eq!(rx.recv().await, Some(SupervisorCommand::Stop));
    }
}
