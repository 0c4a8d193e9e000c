//! Real-time event delivery over WebSocket.
//!
//! Each connection subscribes to the caller's notifier channel and
//! forwards every [`ClientEvent`] as a JSON text frame. Delivery is
//! one-way; the only client traffic handled is ping and close.

use adasim_model::{CallerIdentity, ClientEvent};
use axum::{
    extract::{
        State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::AppState;

/// Convert a client event to a WebSocket message.
fn event_to_websocket(event: &ClientEvent) -> anyhow::Result<Message> {
    let json = serde_json::to_string(event)?;
    Ok(Message::Text(Utf8Bytes::from(json)))
}

/// Handle WebSocket upgrade request.
pub async fn events_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, caller))
}

/// Forward the caller's events until the client goes away or the
/// notifier shuts down.
async fn handle_socket(socket: WebSocket, state: AppState, caller: CallerIdentity) {
    let mut events = state.notifier.subscribe(caller.id);
    let (mut sender, mut receiver) = socket.split();

    debug!(owner = %caller.id, "event session connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(message) = event_to_websocket(&event) else {
                        continue;
                    };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(owner = %caller.id, skipped, "event session lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(_))) => {
                    // tungstenite answers pings on our behalf
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }

    debug!(owner = %caller.id, "event session disconnected");
}
