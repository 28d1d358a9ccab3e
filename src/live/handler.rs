//! WebSocket Handler
//!
//! Upgrade requests and the per-connection loop.
//! The bearer token travels as a `token` query parameter because browsers
//! cannot set headers on WebSocket requests.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::ConnectionHub;
use super::messages::{ClientMessage, ServerMessage};
use crate::api::{ApiError, AppState};
use crate::storage::Role;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// GET /api/v1/ws?token=...
///
/// Upgrades to a WebSocket once the session token resolves.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
) -> Result<Response, ApiError> {
    let session = state.auth.resolve(&params.token)?;
    let hub = Arc::clone(&state.ws_hub);
    let role = session.user.role;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, role)))
}

/// Drive one connection: outbound snapshots and inbound commands share a
/// single select loop until either side goes away.
async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>, role: Role) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut outbox) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx, role).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected WebSocket connection");
            if let Ok(text) = serde_json::to_string(&ServerMessage::error(e.to_string())) {
                let _ = sink.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let hello = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    if hub.send_to(&connection_id, hello).await.is_ok() {
        loop {
            tokio::select! {
                outgoing = outbox.recv() => {
                    let Some(message) = outgoing else { break };
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode server message");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        tracing::debug!(connection_id = %connection_id, "Peer went away during send");
                        break;
                    }
                }
                incoming = stream.next() => {
                    let frame = match incoming {
                        Some(Ok(frame)) => frame,
                        Some(Err(e)) => {
                            tracing::debug!(connection_id = %connection_id, error = %e, "Receive failed");
                            break;
                        }
                        None => break,
                    };
                    if on_frame(&hub, &connection_id, frame).await == Flow::Close {
                        break;
                    }
                }
            }
        }
    }

    // Cancels every mirror this connection held
    hub.unregister(&connection_id).await;
    tracing::debug!(connection_id = %connection_id, "WebSocket closed");
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

async fn on_frame(hub: &ConnectionHub, connection_id: &str, frame: Message) -> Flow {
    let reply = match frame {
        Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(command) => Some(dispatch(hub, connection_id, command).await),
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "Unparseable client frame");
                Some(ServerMessage::error(format!("Invalid message format: {}", e)))
            }
        },
        Message::Binary(_) => Some(ServerMessage::error("Binary messages not supported")),
        Message::Ping(_) | Message::Pong(_) => None,
        Message::Close(_) => return Flow::Close,
    };

    if let Some(reply) = reply {
        let _ = hub.send_to(connection_id, reply).await;
    }
    Flow::Continue
}

/// Apply a subscribe, unsubscribe or ping and build the reply
async fn dispatch(hub: &ConnectionHub, connection_id: &str, command: ClientMessage) -> ServerMessage {
    match command {
        ClientMessage::Subscribe(request) => match hub.subscribe(connection_id, &request).await {
            Ok(topic) => ServerMessage::Subscribed { topic },
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, topic = %request.topic, error = %e, "Subscribe refused");
                ServerMessage::Error {
                    topic: Some(request.topic),
                    message: e.to_string(),
                }
            }
        },
        ClientMessage::Unsubscribe(request) => match hub.unsubscribe(connection_id, &request).await {
            Ok(topic) => ServerMessage::Unsubscribed {
                topic: topic.unwrap_or(request.topic),
            },
            Err(e) => ServerMessage::Error {
                topic: Some(request.topic),
                message: e.to_string(),
            },
        },
        ClientMessage::Ping => ServerMessage::Pong,
    }
}
