//! Page models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gridline_core::types::{DbId, Timestamp};

/// A row from the `pages` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Page {
    pub id: DbId,
    pub app_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a page. The root canvas is created alongside.
#[derive(Debug, Deserialize)]
pub struct CreatePage {
    pub app_id: DbId,
    pub name: String,
}
