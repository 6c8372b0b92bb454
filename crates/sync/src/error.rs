/// Errors raised by the sync client.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server sent something the client did not expect.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server refused the access token.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// The server did not answer the handshake in time.
    #[error("Authentication timed out")]
    AuthTimeout,

    /// The channel has been shut down.
    #[error("Sync channel is closed")]
    Closed,
}
