//! Client side of the page sync protocol.
//!
//! [`SyncChannel`] keeps one authenticated WebSocket to the server, sends
//! every payload the editor produces in order, and reconnects with
//! exponential backoff when the transport drops.

pub mod channel;
pub mod client;
pub mod error;
pub mod reconnect;

pub use channel::{ConnectionState, SyncChannel, SyncConfig};
pub use error::SyncError;
