//! Repository for the `nodes` table.

use serde_json::Value;
use sqlx::PgPool;
use gridline_core::node::{NodeSnapshot, PartialNodeUpdate, Props};
use gridline_core::types::{DbId, NodeId};

use crate::models::node::{parent_to_storage, NodeRow, TreeRow};
use crate::DbTransaction;

/// Column list for nodes queries.
const COLUMNS: &str = "page_id, id, parent_id, node_type, grid_col, grid_row, \
    columns_count, rows_count, is_canvas, column_width, props, created_at, updated_at";

/// Same columns qualified with the `n` alias.
const N_COLUMNS: &str = "n.page_id, n.id, n.parent_id, n.node_type, n.grid_col, n.grid_row, \
    n.columns_count, n.rows_count, n.is_canvas, n.column_width, n.props, n.created_at, n.updated_at";

/// Storage-level field changes for one node.
#[derive(Debug, Default)]
pub struct NodePatch<'a> {
    /// `Some(None)` makes the node the root.
    pub parent_id: Option<Option<&'a str>>,
    pub col: Option<i32>,
    pub row: Option<i32>,
    pub columns_count: Option<i32>,
    pub rows_count: Option<i32>,
    pub is_canvas: Option<bool>,
    /// Merged into the stored props. A `null` value removes the key.
    pub props: Option<&'a Props>,
}

impl<'a> NodePatch<'a> {
    /// Storage form of `update` for the node currently called `id`.
    pub fn from_update(id: &str, update: &'a PartialNodeUpdate) -> Self {
        Self {
            parent_id: update
                .parent_id
                .as_deref()
                .map(|parent| parent_to_storage(id, parent)),
            col: update.col,
            row: update.row,
            columns_count: update.columns_count,
            rows_count: update.rows_count,
            is_canvas: update.is_canvas,
            props: update.props.as_ref(),
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.parent_id.is_none()
            && self.col.is_none()
            && self.row.is_none()
            && self.columns_count.is_none()
            && self.rows_count.is_none()
            && self.is_canvas.is_none()
            && self.props.is_none()
    }
}

pub struct NodeRepo;

impl NodeRepo {
    /// Every node of a page, walking down from the root. Rows come ordered
    /// by depth, siblings by insertion order, so parents always precede
    /// their children.
    pub async fn get_tree(pool: &PgPool, page_id: DbId) -> Result<Vec<TreeRow>, sqlx::Error> {
        let query = format!(
            "WITH RECURSIVE tree AS (
                SELECT {COLUMNS}, sort_key, 0 AS depth
                FROM nodes
                WHERE page_id = $1 AND parent_id IS NULL
                UNION ALL
                SELECT {N_COLUMNS}, n.sort_key, t.depth + 1
                FROM nodes n
                INNER JOIN tree t ON n.page_id = t.page_id AND n.parent_id = t.id
            )
            SELECT {COLUMNS}, depth FROM tree ORDER BY depth, sort_key"
        );
        sqlx::query_as::<_, TreeRow>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find(
        tx: &mut DbTransaction<'_>,
        page_id: DbId,
        id: &str,
    ) -> Result<Option<NodeRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nodes WHERE page_id = $1 AND id = $2");
        sqlx::query_as::<_, NodeRow>(&query)
            .bind(page_id)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Insert a batch of nodes. Parent references are checked at commit, so
    /// the batch may list children before their parents.
    pub async fn insert_batch(
        tx: &mut DbTransaction<'_>,
        page_id: DbId,
        nodes: &[NodeSnapshot],
    ) -> Result<u64, sqlx::Error> {
        sqlx::query("SET CONSTRAINTS fk_nodes_parent DEFERRED")
            .execute(&mut **tx)
            .await?;

        let mut inserted = 0;
        for node in nodes {
            let result = sqlx::query(
                "INSERT INTO nodes
                    (page_id, id, parent_id, node_type, grid_col, grid_row,
                     columns_count, rows_count, is_canvas, column_width, props)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(page_id)
            .bind(&node.id)
            .bind(parent_to_storage(&node.id, &node.parent_id))
            .bind(&node.node_type)
            .bind(node.rect.col)
            .bind(node.rect.row)
            .bind(node.rect.columns_count)
            .bind(node.rect.rows_count)
            .bind(node.is_canvas)
            .bind(node.column_width)
            .bind(Value::Object(node.props.clone()))
            .execute(&mut **tx)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Apply `patch` to one node. Returns `None` if the node does not exist.
    pub async fn update(
        tx: &mut DbTransaction<'_>,
        page_id: DbId,
        id: &str,
        patch: &NodePatch<'_>,
    ) -> Result<Option<NodeRow>, sqlx::Error> {
        let query = format!(
            "UPDATE nodes SET
                parent_id = CASE WHEN $3 THEN $4 ELSE parent_id END,
                grid_col = COALESCE($5, grid_col),
                grid_row = COALESCE($6, grid_row),
                columns_count = COALESCE($7, columns_count),
                rows_count = COALESCE($8, rows_count),
                is_canvas = COALESCE($9, is_canvas),
                props = CASE WHEN $10::jsonb IS NULL THEN props
                    ELSE (props || $10::jsonb) - ARRAY(
                        SELECT key FROM jsonb_each($10::jsonb) WHERE value = 'null'::jsonb
                    )
                END
             WHERE page_id = $1 AND id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NodeRow>(&query)
            .bind(page_id)
            .bind(id)
            .bind(patch.parent_id.is_some())
            .bind(patch.parent_id.flatten())
            .bind(patch.col)
            .bind(patch.row)
            .bind(patch.columns_count)
            .bind(patch.rows_count)
            .bind(patch.is_canvas)
            .bind(patch.props.map(|p| Value::Object(p.clone())))
            .fetch_optional(&mut **tx)
            .await
    }

    /// Change a node's id. Children follow through the cascading parent
    /// reference. Returns `false` if the node does not exist.
    pub async fn rename(
        tx: &mut DbTransaction<'_>,
        page_id: DbId,
        id: &str,
        new_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE nodes SET id = $3 WHERE page_id = $1 AND id = $2")
            .bind(page_id)
            .bind(id)
            .bind(new_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the listed nodes; descendants go with them. The root is never
    /// deleted even when listed. Returns the number of listed rows removed.
    pub async fn delete(
        tx: &mut DbTransaction<'_>,
        page_id: DbId,
        ids: &[NodeId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM nodes
             WHERE page_id = $1 AND id = ANY($2) AND parent_id IS NOT NULL",
        )
        .bind(page_id)
        .bind(ids)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Whether any page of `app_id` has a node called `name`.
    pub async fn name_exists_in_app(
        tx: &mut DbTransaction<'_>,
        app_id: DbId,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM nodes n
                INNER JOIN pages p ON p.id = n.page_id
                WHERE p.app_id = $1 AND n.id = $2
            )",
        )
        .bind(app_id)
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.0)
    }

    pub async fn count_by_page(pool: &PgPool, page_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes WHERE page_id = $1")
            .bind(page_id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
