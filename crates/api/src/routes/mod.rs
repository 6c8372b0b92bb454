pub mod apps;
pub mod health;
pub mod pages;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /apps                         create
/// /apps/{id}                    get
/// /apps/{id}/pages              list pages
/// /apps/{id}/queries            list, create
///
/// /pages                        create (with root canvas)
/// /pages/{id}                   get
/// /pages/{id}/tree              adjacency map
/// /pages/{id}/sync              sync WebSocket
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/apps", apps::router())
        .nest("/pages", pages::router())
}
