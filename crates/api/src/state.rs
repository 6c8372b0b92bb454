use std::sync::Arc;

use crate::config::ServerConfig;
use crate::tree_service::TreePersistenceService;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: gridline_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Every open sync connection.
    pub ws_manager: Arc<WsManager>,
}

impl AppState {
    pub fn new(pool: gridline_db::DbPool, config: ServerConfig, ws_manager: Arc<WsManager>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            ws_manager,
        }
    }

    /// Persistence service over this state's pool.
    pub fn trees(&self) -> TreePersistenceService {
        TreePersistenceService::new(self.pool.clone())
    }
}
