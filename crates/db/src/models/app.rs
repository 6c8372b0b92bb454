use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gridline_core::types::{DbId, Timestamp};

/// A row from the `apps` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct App {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateApp {
    pub name: String,
}
