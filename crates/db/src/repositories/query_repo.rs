//! Repository for the `queries` table.

use sqlx::PgPool;
use gridline_core::types::DbId;

use crate::models::query::{CreateQuery, Query};
use crate::DbTransaction;

const COLUMNS: &str = "id, app_id, name, definition, created_at, updated_at";

pub struct QueryRepo;

impl QueryRepo {
    pub async fn create(
        pool: &PgPool,
        app_id: DbId,
        input: &CreateQuery,
    ) -> Result<Query, sqlx::Error> {
        let query = format!(
            "INSERT INTO queries (app_id, name, definition)
             VALUES ($1, $2, COALESCE($3, '{{}}'::jsonb))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Query>(&query)
            .bind(app_id)
            .bind(&input.name)
            .bind(&input.definition)
            .fetch_one(pool)
            .await
    }

    pub async fn list_by_app(pool: &PgPool, app_id: DbId) -> Result<Vec<Query>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queries WHERE app_id = $1 ORDER BY name");
        sqlx::query_as::<_, Query>(&query)
            .bind(app_id)
            .fetch_all(pool)
            .await
    }

    /// Whether a query of `app_id` is called `name`.
    pub async fn name_exists(
        tx: &mut DbTransaction<'_>,
        app_id: DbId,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM queries WHERE app_id = $1 AND name = $2)")
                .bind(app_id)
                .bind(name)
                .fetch_one(&mut **tx)
                .await?;
        Ok(row.0)
    }
}
