use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gridline_core::types::{DbId, Timestamp};

/// A row from the `queries` table. Query names share the widget-name
/// namespace of their app.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Query {
    pub id: DbId,
    pub app_id: DbId,
    pub name: String,
    pub definition: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuery {
    pub name: String,
    pub definition: Option<serde_json::Value>,
}
