use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use gridline_core::error::CoreError;
use gridline_core::types::DbId;
use gridline_core::wire::{parse_client_event, ClientEvent, ServerEvent};
use gridline_db::repositories::PageRepo;

use crate::auth::jwt::authenticate;
use crate::error::AppResult;
use crate::state::AppState;
use crate::tree_service::TreePersistenceService;

/// GET /api/v1/pages/{id}/sync
///
/// Upgrades to the page's sync socket. The page must exist; the token is
/// checked on the first frame, not on the upgrade request.
pub async fn sync_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    PageRepo::find_by_id(&state.pool, page_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Page",
            id: page_id.to_string(),
        })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, page_id)))
}

/// Manage one sync connection after upgrade.
///
///   1. Wait (bounded) for the `auth` frame; reject and close on failure.
///   2. Register the connection with `WsManager`, confirm, and spawn the
///      sender task.
///   3. Persist inbound batches one at a time, in arrival order.
///   4. Clean up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, page_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();

    let auth_timeout = Duration::from_secs(state.config.sync_auth_timeout_secs);
    let user_id = match tokio::time::timeout(auth_timeout, await_auth_frame(&mut stream, &state)).await
    {
        Ok(Ok(user_id)) => user_id,
        Ok(Err(message)) => {
            reject(&mut sink, &conn_id, page_id, message).await;
            return;
        }
        Err(_) => {
            reject(&mut sink, &conn_id, page_id, "Authentication timed out".into()).await;
            return;
        }
    };

    // Register before confirming so the client is reachable as soon as it
    // hears back. Broadcasts that arrive meanwhile wait in `rx`.
    let mut rx = state
        .ws_manager
        .add(conn_id.clone(), user_id, page_id)
        .await;
    if let Some(msg) = frame(&ServerEvent::Authenticated { user_id }) {
        if sink.send(msg).await.is_err() {
            state.ws_manager.remove(&conn_id).await;
            return;
        }
    }
    tracing::info!(conn_id = %conn_id, page_id, user_id, "Sync connection authenticated");

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Sync sink closed");
                break;
            }
        }
    });

    let trees = state.trees();
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_frame(&state, &trees, &conn_id, page_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "Sync receive error");
                break;
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, page_id, "Sync connection closed");
}

/// Read frames until the first text frame and check it is a valid `auth`.
async fn await_auth_frame(
    stream: &mut SplitStream<WebSocket>,
    state: &AppState,
) -> Result<DbId, String> {
    while let Some(msg) = stream.next().await {
        match msg.map_err(|e| e.to_string())? {
            Message::Text(text) => {
                return match parse_client_event(text.as_str()) {
                    Ok(ClientEvent::Auth(req)) => authenticate(&req.access_token, &state.config.jwt)
                        .map_err(|e| e.to_string()),
                    Ok(other) => Err(format!("Expected auth, got {}", other.name())),
                    Err(e) => Err(format!("Malformed frame: {e}")),
                };
            }
            Message::Close(_) => return Err("Closed before authenticating".into()),
            _ => {}
        }
    }
    Err("Stream ended before authenticating".into())
}

/// Tell the client why the handshake failed, then close.
async fn reject(
    sink: &mut SplitSink<WebSocket, Message>,
    conn_id: &str,
    page_id: DbId,
    message: String,
) {
    tracing::warn!(conn_id, page_id, reason = %message, "Sync authentication failed");
    if let Some(msg) = frame(&ServerEvent::AuthFailed { message }) {
        let _ = sink.send(msg).await;
    }
    let _ = sink.send(Message::Close(None)).await;
}

/// Persist one batch, ack the sender and fan the change out to the page's
/// other connections.
async fn handle_frame(
    state: &AppState,
    trees: &TreePersistenceService,
    conn_id: &str,
    page_id: DbId,
    text: &str,
) {
    let event = match parse_client_event(text) {
        Ok(event) => event,
        Err(e) => {
            let error = ServerEvent::Error {
                event: "unknown".into(),
                code: "BAD_REQUEST".into(),
                message: format!("Malformed frame: {e}"),
            };
            reply(state, conn_id, &error).await;
            return;
        }
    };

    let name = event.name();
    let Some(payload) = event.into_payload() else {
        let error = ServerEvent::Error {
            event: name.into(),
            code: "BAD_REQUEST".into(),
            message: "Connection is already authenticated".into(),
        };
        reply(state, conn_id, &error).await;
        return;
    };

    match trees.apply(page_id, &payload).await {
        Ok(count) => {
            let ack = ServerEvent::Ack {
                event: name.into(),
                count,
            };
            reply(state, conn_id, &ack).await;

            if let Some(msg) = frame(&ServerEvent::TreeChanged(payload)) {
                let reached = state
                    .ws_manager
                    .broadcast_to_page(page_id, Some(conn_id), msg)
                    .await;
                tracing::debug!(conn_id, page_id, event = name, count, reached, "Batch applied");
            }
        }
        Err(e) => {
            let (_, code, message) = e.classify();
            tracing::warn!(conn_id, page_id, event = name, code, error = %e, "Batch rejected");
            let error = ServerEvent::Error {
                event: name.into(),
                code: code.into(),
                message,
            };
            reply(state, conn_id, &error).await;
        }
    }
}

async fn reply(state: &AppState, conn_id: &str, event: &ServerEvent) {
    if let Some(msg) = frame(event) {
        state.ws_manager.send_to(conn_id, msg).await;
    }
}

fn frame(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}
