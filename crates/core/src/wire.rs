//! Sync protocol messages.
//!
//! Every frame is JSON of the shape `{"event": "<name>", "data": ...}`.
//! Clients send [`ClientEvent`]s; the server answers with [`ServerEvent`]s.

use serde::{Deserialize, Serialize};

use crate::node::{NodeSnapshot, PartialNodeUpdate};
use crate::types::{DbId, NodeId};

/// Nodes to create, plus nodes that moved as a side effect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertBatch {
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub side_effects: Vec<PartialNodeUpdate>,
}

/// Ids to delete (descendants cascade), plus nodes that moved as a side
/// effect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBatch {
    #[serde(rename = "nodesId")]
    pub nodes_id: Vec<NodeId>,
    #[serde(default)]
    pub side_effects: Vec<PartialNodeUpdate>,
}

/// What a command changed, as sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum WirePayload {
    Insert(InsertBatch),
    Update(Vec<PartialNodeUpdate>),
    Delete(DeleteBatch),
}

impl WirePayload {
    pub fn name(&self) -> &'static str {
        match self {
            WirePayload::Insert(_) => "insert",
            WirePayload::Update(_) => "update",
            WirePayload::Delete(_) => "delete",
        }
    }

    /// Number of rows the payload touches.
    pub fn len(&self) -> usize {
        match self {
            WirePayload::Insert(b) => b.nodes.len() + b.side_effects.len(),
            WirePayload::Update(u) => u.len(),
            WirePayload::Delete(b) => b.nodes_id.len() + b.side_effects.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handshake payload. Must be the first frame on a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub access_token: String,
}

/// Frames sent by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Auth(AuthRequest),
    Insert(InsertBatch),
    Update(Vec<PartialNodeUpdate>),
    Delete(DeleteBatch),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Auth(_) => "auth",
            ClientEvent::Insert(_) => "insert",
            ClientEvent::Update(_) => "update",
            ClientEvent::Delete(_) => "delete",
        }
    }

    /// The mutation carried by this frame, if any.
    pub fn into_payload(self) -> Option<WirePayload> {
        match self {
            ClientEvent::Auth(_) => None,
            ClientEvent::Insert(b) => Some(WirePayload::Insert(b)),
            ClientEvent::Update(u) => Some(WirePayload::Update(u)),
            ClientEvent::Delete(b) => Some(WirePayload::Delete(b)),
        }
    }
}

impl From<WirePayload> for ClientEvent {
    fn from(payload: WirePayload) -> Self {
        match payload {
            WirePayload::Insert(b) => ClientEvent::Insert(b),
            WirePayload::Update(u) => ClientEvent::Update(u),
            WirePayload::Delete(b) => ClientEvent::Delete(b),
        }
    }
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The handshake succeeded.
    Authenticated { user_id: DbId },
    /// The handshake failed; the server closes the connection next.
    AuthFailed { message: String },
    /// A mutation frame was committed.
    Ack { event: String, count: usize },
    /// A mutation frame was rolled back.
    Error {
        event: String,
        code: String,
        message: String,
    },
    /// Another connection changed the same page.
    TreeChanged(WirePayload),
}

/// Parse an inbound client frame.
pub fn parse_client_event(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Parse an inbound server frame.
pub fn parse_server_event(text: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(text)
}
