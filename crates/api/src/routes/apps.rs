use axum::routing::{get, post};
use axum::Router;

use crate::handlers::apps;
use crate::state::AppState;

/// App routes mounted at `/apps`.
///
/// ```text
/// POST   /                 -> create_app
/// GET    /{id}             -> get_app
/// GET    /{id}/pages       -> list_pages
/// GET    /{id}/queries     -> list_queries
/// POST   /{id}/queries     -> create_query
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(apps::create_app))
        .route("/{id}", get(apps::get_app))
        .route("/{id}/pages", get(apps::list_pages))
        .route(
            "/{id}/queries",
            get(apps::list_queries).post(apps::create_query),
        )
}
