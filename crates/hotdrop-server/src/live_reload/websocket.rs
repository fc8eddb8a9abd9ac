//! WebSocket handler for live reload.
//!
//! Runs the protocol handshake and forwards hub frames to the client.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;

use super::hub::ClientId;
use super::protocol::ClientMessage;
use crate::state::AppState;

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let hub = &state.hub;
    let id = hub.next_client_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut closing = hub.closing();
    if *closing.borrow() {
        return;
    }

    loop {
        tokio::select! {
            _ = closing.changed() => break,
            // Forward hub frames to client
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_message(&state, id, text.as_str(), &tx)
                            && socket.send(Message::Text(reply.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.unregister_client(id);
}

/// Apply one client message; returns the encoded reply, if any.
fn handle_message(
    state: &AppState,
    id: ClientId,
    text: &str,
    tx: &mpsc::UnboundedSender<String>,
) -> Option<String> {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(client = %id, error = %e, "Ignoring live reload message");
            return None;
        }
    };

    match message {
        ClientMessage::Hello { protocols } => {
            tracing::debug!(client = %id, ?protocols, "Live reload handshake");
            match state.hub.greeting().to_json() {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode greeting");
                    None
                }
            }
        }
        ClientMessage::Info { url: Some(url) } => {
            state.hub.register_client(id, url, tx.clone());
            None
        }
        ClientMessage::Info { url: None } => {
            tracing::debug!(client = %id, "Ignoring info message without url");
            None
        }
        ClientMessage::Unknown => None,
    }
}
