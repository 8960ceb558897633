//! WebSocket handler: chat subscriber relay.
//!
//! DESIGN
//! ======
//! On upgrade the connection registers with the hub and enters a `select!`
//! loop:
//! - Incoming client text → parse + `submit_frame`; invalid input is dropped
//!   without a reply
//! - Queued hub output → broadcast frames and liveness pings to the client
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register → send `{type:"history"}` snapshot
//! 2. Client frames → hub submit → hub broadcasts to every subscriber
//! 3. Pong → mark alive for the next sweep
//! 4. Close, socket error, or hub reclaim (queue closed) → deregister

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ChatMessage, ErrorCode, ServerFrame};
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::hub::{ChatHub, Outbound, Subscription};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let Subscription { id, history, mut rx } = state.hub.connect();
    info!(subscriber_id = %id, history = history.len(), "ws: subscriber connected");

    let welcome = frames::encode_frame(&ServerFrame::History { messages: history });
    if socket.send(Message::Text(welcome.into())).await.is_err() {
        state.hub.disconnect(id);
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        if let Some(message) = process_inbound_text(&state.hub, id, text.as_str()) {
                            debug!(subscriber_id = %id, timestamp = message.timestamp, "ws: message accepted");
                        }
                    }
                    Message::Pong(_) => state.hub.mark_alive(id),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            out = rx.recv() => {
                let Some(out) = out else {
                    info!(subscriber_id = %id, "ws: subscriber reclaimed by hub");
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                let sent = match out {
                    Outbound::Frame(text) => socket.send(Message::Text(text.as_ref().into())).await,
                    Outbound::Ping => socket.send(Message::Ping(Bytes::new())).await,
                };
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.disconnect(id);
    info!(subscriber_id = %id, "ws: subscriber disconnected");
}

// =============================================================================
// INBOUND
// =============================================================================

/// Parse one inbound text frame and submit it. Malformed or invalid frames
/// are logged and dropped; nothing is sent back on the wire.
fn process_inbound_text(hub: &ChatHub, subscriber_id: Uuid, text: &str) -> Option<ChatMessage> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            debug!(%subscriber_id, error = %e, "ws: dropping non-JSON frame");
            return None;
        }
    };

    match hub.submit_frame(&value) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!(%subscriber_id, code = e.error_code(), error = %e, "ws: dropping invalid chat frame");
            None
        }
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
