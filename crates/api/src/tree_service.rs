//! Durable counterpart of the editor's widget tree.
//!
//! [`TreePersistenceService`] applies the same `insert` / `update` /
//! `delete` batches the editor produces. Each batch runs in one
//! transaction: either every node and side effect in it lands, or none do.

use gridline_core::error::CoreError;
use gridline_core::node::{NodeSnapshot, PartialNodeUpdate};
use gridline_core::types::{DbId, NodeId};
use gridline_core::wire::{DeleteBatch, InsertBatch, WirePayload};
use gridline_db::repositories::{NodePatch, NodeRepo, PageRepo, QueryRepo};
use gridline_db::{DbPool, DbTransaction};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// One node of a page tree with its ordered child ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: NodeSnapshot,
    pub nodes: Vec<NodeId>,
}

/// Adjacency map of a page. Parents come before their children.
pub type PageTree = IndexMap<NodeId, TreeNode>;

#[derive(Clone)]
pub struct TreePersistenceService {
    pool: DbPool,
}

impl TreePersistenceService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Load the whole tree of a page. Fails if the page has no nodes.
    pub async fn get_tree(&self, page_id: DbId) -> AppResult<PageTree> {
        let rows = NodeRepo::get_tree(&self.pool, page_id).await?;
        if rows.is_empty() {
            return Err(CoreError::NotFound {
                entity: "Page",
                id: page_id.to_string(),
            }
            .into());
        }

        let mut tree = PageTree::with_capacity(rows.len());
        for row in rows {
            let node = row.node.into_snapshot();
            if !node.is_root() {
                let parent = tree.get_mut(&node.parent_id).ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Node '{}' read before its parent '{}'",
                        node.id, node.parent_id
                    ))
                })?;
                parent.nodes.push(node.id.clone());
            }
            tree.insert(
                node.id.clone(),
                TreeNode {
                    node,
                    nodes: Vec::new(),
                },
            );
        }
        Ok(tree)
    }

    /// Persist one wire payload. Returns the number of rows it touched.
    pub async fn apply(&self, page_id: DbId, payload: &WirePayload) -> AppResult<usize> {
        match payload {
            WirePayload::Insert(batch) => self.insert(page_id, batch).await,
            WirePayload::Update(updates) => self.update(page_id, updates).await,
            WirePayload::Delete(batch) => self.delete(page_id, batch).await,
        }
    }

    /// Insert new nodes and apply the displacements they caused. Parents
    /// may follow their children within the batch.
    pub async fn insert(&self, page_id: DbId, batch: &InsertBatch) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        let inserted = NodeRepo::insert_batch(&mut tx, page_id, &batch.nodes).await?;
        self.update_in(&mut tx, page_id, &batch.side_effects).await?;
        tx.commit().await?;

        tracing::info!(
            page_id,
            inserted,
            side_effects = batch.side_effects.len(),
            "Nodes inserted",
        );
        Ok(batch.nodes.len() + batch.side_effects.len())
    }

    /// Apply partial updates. An update whose `name` differs from its `id`
    /// renames the node first; the new name must be free across the app's
    /// widgets and queries.
    pub async fn update(&self, page_id: DbId, updates: &[PartialNodeUpdate]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        self.update_in(&mut tx, page_id, updates).await?;
        tx.commit().await?;

        tracing::info!(page_id, count = updates.len(), "Nodes updated");
        Ok(updates.len())
    }

    /// Delete nodes with their subtrees and apply the resulting
    /// displacements. The root is never deleted; a batch that removes
    /// nothing is an error.
    pub async fn delete(&self, page_id: DbId, batch: &DeleteBatch) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        let deleted = NodeRepo::delete(&mut tx, page_id, &batch.nodes_id).await?;
        if deleted == 0 {
            return Err(CoreError::Validation(format!(
                "No deletable node among {:?}",
                batch.nodes_id
            ))
            .into());
        }
        self.update_in(&mut tx, page_id, &batch.side_effects).await?;
        tx.commit().await?;

        tracing::info!(
            page_id,
            deleted,
            side_effects = batch.side_effects.len(),
            "Nodes deleted",
        );
        Ok(deleted as usize + batch.side_effects.len())
    }

    async fn update_in(
        &self,
        tx: &mut DbTransaction<'_>,
        page_id: DbId,
        updates: &[PartialNodeUpdate],
    ) -> AppResult<()> {
        let mut app_id = None;
        for update in updates {
            let mut id = update.id.as_str();

            if let Some(new_id) = update.name.as_deref().filter(|name| *name != id) {
                let app = match app_id {
                    Some(app) => app,
                    None => {
                        let app = self.app_of(page_id).await?;
                        app_id = Some(app);
                        app
                    }
                };
                rename_node(tx, app, page_id, id, new_id).await?;
                id = new_id;
            }

            let patch = NodePatch::from_update(id, update);
            if patch.is_empty() {
                continue;
            }
            NodeRepo::update(tx, page_id, id, &patch)
                .await?
                .ok_or_else(|| CoreError::node_not_found(id))?;
        }
        Ok(())
    }

    async fn app_of(&self, page_id: DbId) -> AppResult<DbId> {
        let page = PageRepo::find_by_id(&self.pool, page_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Page",
                id: page_id.to_string(),
            })?;
        Ok(page.app_id)
    }
}

/// Give a node a new id after checking the app-wide name namespace.
async fn rename_node(
    tx: &mut DbTransaction<'_>,
    app_id: DbId,
    page_id: DbId,
    id: &str,
    new_id: &str,
) -> AppResult<()> {
    if new_id.trim().is_empty() {
        return Err(CoreError::Validation("Widget name must not be empty".into()).into());
    }
    if NodeRepo::name_exists_in_app(tx, app_id, new_id).await? {
        return Err(CoreError::Conflict(format!("A widget named '{new_id}' already exists")).into());
    }
    if QueryRepo::name_exists(tx, app_id, new_id).await? {
        return Err(CoreError::Conflict(format!("A query named '{new_id}' already exists")).into());
    }
    if !NodeRepo::rename(tx, page_id, id, new_id).await? {
        return Err(CoreError::node_not_found(id).into());
    }
    tracing::info!(page_id, from = id, to = new_id, "Node renamed");
    Ok(())
}
