//! WebSocket connection and handshake.
//!
//! [`SyncClient`] holds what is needed to reach one page's sync endpoint.
//! [`SyncClient::connect`] opens the socket and completes the `auth`
//! handshake before handing back a [`SyncConnection`].

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use gridline_core::types::DbId;
use gridline_core::wire::{parse_server_event, AuthRequest, ClientEvent, ServerEvent};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::SyncError;

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection settings for one sync endpoint.
#[derive(Debug, Clone)]
pub struct SyncClient {
    url: String,
    access_token: String,
    auth_timeout: Duration,
}

/// An authenticated connection.
pub struct SyncConnection {
    pub user_id: DbId,
    pub ws_stream: WsStream,
}

impl SyncClient {
    /// * `url`          - sync endpoint, e.g. `ws://host:3000/api/v1/pages/7/sync`.
    /// * `access_token` - JWT sent in the `auth` frame.
    pub fn new(url: String, access_token: String, auth_timeout: Duration) -> Self {
        Self {
            url,
            access_token,
            auth_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and authenticate.
    pub async fn connect(&self) -> Result<SyncConnection, SyncError> {
        let (mut ws_stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SyncError::Connection(format!("Failed to connect to {}: {e}", self.url)))?;

        let auth = ClientEvent::Auth(AuthRequest {
            access_token: self.access_token.clone(),
        });
        let text = serde_json::to_string(&auth).map_err(|e| SyncError::Protocol(e.to_string()))?;
        ws_stream
            .send(Message::Text(text))
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;

        let reply = tokio::time::timeout(self.auth_timeout, next_server_event(&mut ws_stream))
            .await
            .map_err(|_| SyncError::AuthTimeout)??;

        match reply {
            ServerEvent::Authenticated { user_id } => {
                tracing::info!(url = %self.url, user_id, "Sync channel authenticated");
                Ok(SyncConnection { user_id, ws_stream })
            }
            ServerEvent::AuthFailed { message } => Err(SyncError::AuthRejected(message)),
            other => Err(SyncError::Protocol(format!(
                "Expected handshake reply, got {other:?}"
            ))),
        }
    }
}

/// Read frames until a server event arrives.
async fn next_server_event(ws_stream: &mut WsStream) -> Result<ServerEvent, SyncError> {
    while let Some(msg) = ws_stream.next().await {
        match msg.map_err(|e| SyncError::Connection(e.to_string()))? {
            Message::Text(text) => {
                return parse_server_event(&text).map_err(|e| SyncError::Protocol(e.to_string()))
            }
            Message::Close(frame) => {
                return Err(SyncError::Connection(format!("Closed during handshake: {frame:?}")))
            }
            _ => {}
        }
    }
    Err(SyncError::Connection("Stream ended during handshake".into()))
}
