//! Repository for the `pages` table.

use sqlx::PgPool;
use gridline_core::tree::{ROOT_COLUMNS, ROOT_ID};
use gridline_core::types::DbId;

use crate::models::page::{CreatePage, Page};

const COLUMNS: &str = "id, app_id, name, created_at, updated_at";

pub struct PageRepo;

impl PageRepo {
    /// Insert a page together with its root canvas.
    ///
    /// Both rows commit together, so a page is never visible without a root.
    pub async fn create(pool: &PgPool, input: &CreatePage) -> Result<Page, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO pages (app_id, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let page = sqlx::query_as::<_, Page>(&query)
            .bind(input.app_id)
            .bind(&input.name)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO nodes
                (page_id, id, parent_id, node_type, grid_col, grid_row,
                 columns_count, rows_count, is_canvas)
             VALUES ($1, $2, NULL, 'canvas', 0, 0, $3, 0, true)",
        )
        .bind(page.id)
        .bind(ROOT_ID)
        .bind(ROOT_COLUMNS)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(page_id = page.id, app_id = page.app_id, "Page created");
        Ok(page)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_app(pool: &PgPool, app_id: DbId) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE app_id = $1 ORDER BY created_at, id");
        sqlx::query_as::<_, Page>(&query)
            .bind(app_id)
            .fetch_all(pool)
            .await
    }
}
