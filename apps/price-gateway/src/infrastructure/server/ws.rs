//! Viewer WebSocket Endpoint
//!
//! One task per viewer connection. The currency id resolves to a ticker
//! before the upgrade, so an unknown id is rejected with a plain HTTP
//! error instead of an accepted-then-closed socket. After the upgrade the
//! session drains the viewer's outbound channel and answers client text
//! frames with a pong.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;

use crate::application::ports::{CurrencyResolver, ResolveError};
use crate::domain::pricing::ViewerMessage;
use crate::domain::subscription::ViewerHandle;
use crate::infrastructure::server::AppState;

/// `GET /ws/prices/{currency_id}` - live price stream for one currency.
pub async fn prices_ws(
    State(state): State<Arc<AppState>>,
    Path(currency_id): Path<i64>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let ticker = match state.cmc.ticker_symbol(currency_id).await {
        Ok(ticker) => ticker,
        Err(ResolveError::UnknownCurrency(id)) => {
            return (StatusCode::NOT_FOUND, format!("unknown currency id {id}")).into_response();
        }
        Err(ResolveError::Provider(detail)) => {
            tracing::warn!(currency_id, error = %detail, "Currency resolution failed");
            return (StatusCode::BAD_GATEWAY, detail).into_response();
        }
    };

    upgrade.on_upgrade(move |socket| viewer_session(state, socket, ticker))
}

/// Run one viewer session to completion.
async fn viewer_session(state: Arc<AppState>, mut socket: WebSocket, ticker: String) {
    let viewer = state.next_viewer_id.fetch_add(1, Ordering::Relaxed);
    let (tx, mut rx) = mpsc::channel(state.viewer_channel_capacity);

    let symbol = state
        .service
        .on_viewer_connect(ViewerHandle::new(viewer, tx), &ticker);
    tracing::debug!(viewer, %ticker, %symbol, "Viewer session started");

    loop {
        tokio::select! {
            update = rx.recv() => {
                // A closed channel means the registry dropped this viewer
                // (pruned after a failed delivery, or replaced).
                let Some(message) = update else { break };
                if send_json(&mut socket, &message).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    // Any client text frame is a keepalive.
                    Some(Ok(Message::Text(_))) => {
                        if send_json(&mut socket, &ViewerMessage::Pong).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.service.on_viewer_disconnect(viewer);
    tracing::debug!(viewer, "Viewer session ended");
}

async fn send_json(
    socket: &mut WebSocket,
    message: &ViewerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(text) => socket.send(Message::Text(text.into())).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize viewer message");
            Ok(())
        }
    }
}
