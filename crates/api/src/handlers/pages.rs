//! Handlers for pages and their widget trees.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use gridline_core::error::CoreError;
use gridline_core::types::DbId;
use gridline_db::models::page::CreatePage;
use gridline_db::repositories::{AppRepo, PageRepo};

use crate::error::AppResult;
use crate::handlers::require_name;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/pages
///
/// Creates the page together with its root canvas.
pub async fn create_page(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePage>,
) -> AppResult<impl IntoResponse> {
    require_name("Page name", &input.name)?;
    AppRepo::find_by_id(&state.pool, input.app_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "App",
            id: input.app_id.to_string(),
        })?;

    let page = PageRepo::create(&state.pool, &input).await?;
    tracing::info!(page_id = page.id, user_id = user.user_id, "Page created via API");
    Ok((StatusCode::CREATED, Json(DataResponse { data: page })))
}

/// GET /api/v1/pages/{id}
pub async fn get_page(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let page = PageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Page",
            id: id.to_string(),
        })?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/pages/{id}/tree
///
/// The page's adjacency map: `{ "<id>": { ...node, "nodes": [childIds] } }`.
pub async fn get_tree(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let tree = state.trees().get_tree(id).await?;
    Ok(Json(DataResponse { data: tree }))
}
