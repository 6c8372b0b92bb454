//! Handlers for apps and their queries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use gridline_core::error::CoreError;
use gridline_core::types::DbId;
use gridline_db::models::app::CreateApp;
use gridline_db::models::query::CreateQuery;
use gridline_db::repositories::{AppRepo, PageRepo, QueryRepo};

use crate::error::AppResult;
use crate::handlers::require_name;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/apps
pub async fn create_app(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateApp>,
) -> AppResult<impl IntoResponse> {
    require_name("App name", &input.name)?;
    let app = AppRepo::create(&state.pool, &input).await?;
    tracing::info!(app_id = app.id, user_id = user.user_id, "App created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: app })))
}

/// GET /api/v1/apps/{id}
pub async fn get_app(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let app = AppRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "App",
            id: id.to_string(),
        })?;
    Ok(Json(DataResponse { data: app }))
}

/// GET /api/v1/apps/{id}/pages
pub async fn list_pages(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let pages = PageRepo::list_by_app(&state.pool, id).await?;
    Ok(Json(DataResponse { data: pages }))
}

/// GET /api/v1/apps/{id}/queries
pub async fn list_queries(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let queries = QueryRepo::list_by_app(&state.pool, id).await?;
    Ok(Json(DataResponse { data: queries }))
}

/// POST /api/v1/apps/{id}/queries
///
/// Query names share the app's widget-name namespace.
pub async fn create_query(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateQuery>,
) -> AppResult<impl IntoResponse> {
    require_name("Query name", &input.name)?;
    let query = QueryRepo::create(&state.pool, id, &input).await?;
    tracing::info!(
        app_id = id,
        query_id = query.id,
        user_id = user.user_id,
        "Query created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: query })))
}
