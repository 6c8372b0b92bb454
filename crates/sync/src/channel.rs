//! The editor's persistent, ordered link to the server.
//!
//! Payloads are queued on an unbounded channel and written by a background
//! task, so the editor never waits on the network. While the transport is
//! down the queue keeps filling; after the channel re-authenticates it is
//! drained in order. A frame whose write fails is logged and dropped.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use gridline_core::command::PayloadSink;
use gridline_core::types::DbId;
use gridline_core::wire::{parse_server_event, ClientEvent, ServerEvent, WirePayload};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::{SyncClient, SyncConnection};
use crate::error::SyncError;
use crate::reconnect::{reconnect_loop, ReconnectConfig};

/// Broadcast channel capacity for server events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long [`SyncChannel::close`] waits for the background task.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Sync endpoint of one page, e.g. `ws://host:3000/api/v1/pages/7/sync`.
    pub url: String,
    pub access_token: String,
    /// How long to wait for the server to answer `auth`.
    pub auth_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: access_token.into(),
            auth_timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Observable transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
    Closed,
}

/// Why one connected session ended.
enum SessionEnd {
    Cancelled,
    QueueClosed,
    Lost,
}

#[derive(Debug)]
pub struct SyncChannel {
    outbound: mpsc::UnboundedSender<WirePayload>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<ServerEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    user_id: DbId,
}

impl SyncChannel {
    /// Open the connection and authenticate. Fails if the first handshake
    /// fails; later losses are retried in the background.
    pub async fn connect(config: SyncConfig) -> Result<Self, SyncError> {
        let client = SyncClient::new(config.url, config.access_token, config.auth_timeout);
        let conn = client.connect().await?;
        let user_id = conn.user_id;

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Connected);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_channel(
            client,
            config.reconnect,
            conn,
            outbound_rx,
            state_tx,
            events.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            outbound,
            state,
            events,
            cancel,
            task: Some(task),
            user_id,
        })
    }

    /// Queue a payload for delivery. Never waits on the network.
    pub fn send_payload(&self, payload: WirePayload) -> Result<(), SyncError> {
        self.outbound.send(payload).map_err(|_| SyncError::Closed)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Subscribe to acks, errors and changes made by other connections.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// User the server authenticated on the first handshake.
    pub fn user_id(&self) -> DbId {
        self.user_id
    }

    /// Stop the background task and close the socket.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(CLOSE_TIMEOUT, task).await;
        }
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl PayloadSink for SyncChannel {
    fn send(&mut self, payload: WirePayload) {
        let event = payload.name();
        if let Err(e) = self.send_payload(payload) {
            tracing::warn!(event, error = %e, "Payload dropped, sync channel closed");
        }
    }
}

/// Connection loop: run the session, then reconnect when it drops.
async fn run_channel(
    client: SyncClient,
    reconnect: ReconnectConfig,
    mut conn: SyncConnection,
    mut outbound: mpsc::UnboundedReceiver<WirePayload>,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ServerEvent>,
    cancel: CancellationToken,
) {
    loop {
        let _ = state.send(ConnectionState::Connected);
        match run_session(&mut conn, &mut outbound, &events, &cancel).await {
            SessionEnd::Cancelled | SessionEnd::QueueClosed => {
                let _ = conn.ws_stream.close(None).await;
                break;
            }
            SessionEnd::Lost => {
                let _ = state.send(ConnectionState::Reconnecting);
                tracing::info!(url = client.url(), queued = outbound.len(), "Sync connection lost");
                match reconnect_loop(&client, &reconnect, &cancel).await {
                    Some(next) => conn = next,
                    None => break,
                }
            }
        }
    }
    let _ = state.send(ConnectionState::Closed);
    tracing::info!(url = client.url(), "Sync channel closed");
}

/// Pump one authenticated connection until it ends.
async fn run_session(
    conn: &mut SyncConnection,
    outbound: &mut mpsc::UnboundedReceiver<WirePayload>,
    events: &broadcast::Sender<ServerEvent>,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return SessionEnd::Cancelled,

            payload = outbound.recv() => {
                let Some(payload) = payload else {
                    return SessionEnd::QueueClosed;
                };
                let name = payload.name();
                let count = payload.len();
                let text = match serde_json::to_string(&ClientEvent::from(payload)) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(event = name, error = %e, "Failed to encode payload");
                        continue;
                    }
                };
                if let Err(e) = conn.ws_stream.send(Message::Text(text)).await {
                    tracing::warn!(event = name, count, error = %e, "Payload lost, send failed");
                    return SessionEnd::Lost;
                }
                tracing::trace!(event = name, count, "Payload sent");
            }

            frame = conn.ws_stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match parse_server_event(&text) {
                        Ok(event) => {
                            log_server_event(&event);
                            let _ = events.send(event);
                        }
                        Err(e) => tracing::warn!(error = %e, "Unparseable server frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Server closed sync connection");
                        return SessionEnd::Lost;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Sync receive error");
                        return SessionEnd::Lost;
                    }
                    None => return SessionEnd::Lost,
                }
            }
        }
    }
}

fn log_server_event(event: &ServerEvent) {
    match event {
        ServerEvent::Ack { event, count } => {
            tracing::debug!(event = %event, count, "Server acknowledged batch");
        }
        ServerEvent::Error {
            event,
            code,
            message,
        } => {
            tracing::warn!(event = %event, code = %code, %message, "Server rejected batch");
        }
        ServerEvent::TreeChanged(payload) => {
            tracing::debug!(event = payload.name(), "Page changed by another connection");
        }
        ServerEvent::Authenticated { .. } | ServerEvent::AuthFailed { .. } => {
            tracing::warn!(?event, "Unexpected handshake frame after authentication");
        }
    }
}
