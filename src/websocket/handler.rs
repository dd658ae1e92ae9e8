//! WebSocket Handler
//!
//! Upgrades authenticated requests and runs the per-connection loop.
//! Browsers cannot set headers on a WebSocket handshake, so the bearer
//! token may also be passed as `?token=`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::hub::ConnectionHub;
use super::messages::{ClientMessage, ServerMessage, APPLICATIONS_TOPIC, MARKETPLACE_TOPIC};
use crate::api::extract::{authenticate_token, bearer_token};
use crate::api::{ApiError, AppState};
use crate::auth::Principal;
use crate::store::{Role, Store};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

/// GET /ws
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)
        .map(str::to_string)
        .or(params.token)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
    let user = authenticate_token(&state, &token)?;
    let principal = Principal::from(&user);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, principal)))
}

/// Whether `principal` may follow `topic`.
///
/// Admins see everything, investors follow the marketplace, borrowers
/// follow their own applications.
pub fn topic_allowed(store: &Store, principal: &Principal, topic: &str) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Investor => topic == MARKETPLACE_TOPIC || topic.starts_with("marketplace."),
        Role::Borrower => match topic.split_once('.') {
            Some((APPLICATIONS_TOPIC, id)) => Uuid::parse_str(id)
                .ok()
                .and_then(|id| store.get_application(id).ok())
                .map(|app| app.borrower_id == principal.user_id)
                .unwrap_or(false),
            _ => false,
        },
    }
}

fn to_text(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, principal: Principal) {
    let hub = Arc::clone(&state.ws_hub);
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register WebSocket connection");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Some(msg) = to_text(&error_msg) {
                let _ = sender.send(msg).await;
            }
            return;
        }
    };
    tracing::debug!(
        connection_id = %connection_id,
        user_id = %principal.user_id,
        "WebSocket authenticated"
    );

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let sent = match to_text(&connected) {
        Some(msg) => sender.send(msg).await.is_ok(),
        None => false,
    };
    if !sent {
        hub.unregister(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(frame) = to_text(&msg) else { continue };
            if sender.send(frame).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let conn_id_for_recv = connection_id.clone();
    let state_for_recv = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    let keep_open =
                        handle_ws_message(&state_for_recv, &principal, &conn_id_for_recv, msg)
                            .await;
                    if !keep_open {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&connection_id).await;
}

/// Returns false when the connection should close
async fn handle_ws_message(
    state: &AppState,
    principal: &Principal,
    connection_id: &str,
    message: Message,
) -> bool {
    let hub = &state.ws_hub;
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(state, principal, connection_id, client_msg).await
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "Invalid client message"
                    );
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = hub.send_to(connection_id, error_msg).await;
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

async fn handle_client_message(
    state: &AppState,
    principal: &Principal,
    connection_id: &str,
    message: ClientMessage,
) {
    let hub: &ConnectionHub = &state.ws_hub;
    let reply = match message {
        ClientMessage::Subscribe { topics } => {
            let (allowed, denied): (Vec<String>, Vec<String>) = topics
                .into_iter()
                .partition(|topic| topic_allowed(&state.store, principal, topic));
            if !denied.is_empty() {
                let _ = hub
                    .send_to(
                        connection_id,
                        ServerMessage::Error {
                            message: format!("Not permitted: {}", denied.join(", ")),
                        },
                    )
                    .await;
            }
            hub.subscribe(connection_id, allowed)
                .await
                .map(|topics| ServerMessage::Subscribed { topics })
        }
        ClientMessage::Unsubscribe { topics } => hub
            .unsubscribe(connection_id, topics)
            .await
            .map(|topics| ServerMessage::Unsubscribed { topics }),
        ClientMessage::Ping => Ok(ServerMessage::Pong),
    };

    let reply = reply.unwrap_or_else(|e| {
        tracing::error!(connection_id = %connection_id, error = %e, "Subscription error");
        ServerMessage::Error {
            message: e.to_string(),
        }
    });
    let _ = hub.send_to(connection_id, reply).await;
}
