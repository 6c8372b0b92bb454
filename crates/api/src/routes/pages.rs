use axum::routing::{get, post};
use axum::Router;

use crate::handlers::pages;
use crate::state::AppState;
use crate::ws;

/// Page routes mounted at `/pages`.
///
/// ```text
/// POST   /                 -> create_page
/// GET    /{id}             -> get_page
/// GET    /{id}/tree        -> get_tree
/// GET    /{id}/sync        -> sync WebSocket
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(pages::create_page))
        .route("/{id}", get(pages::get_page))
        .route("/{id}/tree", get(pages::get_tree))
        .route("/{id}/sync", get(ws::sync_handler))
}
