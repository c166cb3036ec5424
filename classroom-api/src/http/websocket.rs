//! WebSocket endpoint for the teacher and whiteboard apps
//!
//! Frames are JSON text `{"event": ..., "data": ...}`. Each socket gets a
//! connection id and a writer task draining its outbound channel; inbound
//! frames are turned into Broadcast Relay calls.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use classroom_core::models::{ConnectionId, Role, SessionId};
use classroom_relay::{ClientEvent, MessageSender, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::http::AppState;

/// Signaling frames are small; the default limit (64 MB) is excessive
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    info!(connection_id = %connection_id, "WebSocket connection established");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Server events -> WebSocket
    let writer_id = connection_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!(connection_id = %writer_id, error = %e, "Failed to encode event");
                    continue;
                }
            };
            if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                debug!(connection_id = %writer_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_client_frame(&state, &connection_id, &tx, text.as_str());
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.relay.on_disconnect(&connection_id);
    drop(tx);
    writer.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Dispatch one inbound text frame; bad frames are logged and dropped
fn handle_client_frame(
    state: &AppState,
    connection_id: &ConnectionId,
    sender: &MessageSender,
    text: &str,
) {
    let event = match ClientEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(connection_id = %connection_id, error = %e, "Ignoring malformed frame");
            return;
        }
    };

    match event {
        ClientEvent::JoinAsTeacher(session_id) => {
            join(state, connection_id, sender, session_id, Role::Teacher);
        }
        ClientEvent::JoinAsWhiteboard(session_id) => {
            join(state, connection_id, sender, session_id, Role::Whiteboard);
        }
        ClientEvent::ModeChange(change) => {
            state.relay.relay_mode_change(connection_id, change);
        }
        ClientEvent::GenerationRequest(payload) => {
            state.relay.relay_generation_request(connection_id, payload);
        }
    }
}

fn join(
    state: &AppState,
    connection_id: &ConnectionId,
    sender: &MessageSender,
    session_id: SessionId,
    role: Role,
) {
    if session_id.as_str().is_empty() {
        warn!(connection_id = %connection_id, role = %role, "Join without session id ignored");
        return;
    }
    state
        .relay
        .join_room(connection_id, &session_id, role, sender.clone());
}
