//! Repository for the `apps` table.

use sqlx::PgPool;
use gridline_core::types::DbId;

use crate::models::app::{App, CreateApp};

const COLUMNS: &str = "id, name, created_at, updated_at";

pub struct AppRepo;

impl AppRepo {
    pub async fn create(pool: &PgPool, input: &CreateApp) -> Result<App, sqlx::Error> {
        let query = format!("INSERT INTO apps (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, App>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<App>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM apps WHERE id = $1");
        sqlx::query_as::<_, App>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
