//! Page sync over WebSocket.
//!
//! Provides connection management, heartbeat monitoring, and the upgrade
//! handler that authenticates a connection and persists its batches.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::sync_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
