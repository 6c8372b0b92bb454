//! Paste clipboard contents as fresh nodes.

use std::collections::HashMap;

use serde_json::Value;

use crate::clipboard::ClipboardContents;
use crate::command::{displaced_updates, CommandResult, Execute, Undoable};
use crate::error::CoreError;
use crate::grid::{GridPoint, GridRect};
use crate::node::{NodeSnapshot, NAME_PROP};
use crate::tree::{Displacement, WidgetTree};
use crate::types::NodeId;
use crate::wire::{DeleteBatch, InsertBatch, WirePayload};

#[derive(Debug, Default)]
struct Applied {
    /// Every created id, parents first.
    created: Vec<NodeId>,
    /// Created ids that sit directly under the target.
    tops: Vec<NodeId>,
    displaced: Displacement,
}

/// Clone captured subtrees under `target_parent`, with the top-left of the
/// pasted group at `cursor`.
#[derive(Debug)]
pub struct PasteCommand {
    contents: ClipboardContents,
    target_parent: NodeId,
    cursor: GridPoint,
    applied: Option<Applied>,
}

impl PasteCommand {
    pub fn new(contents: ClipboardContents, target_parent: impl Into<NodeId>, cursor: GridPoint) -> Self {
        Self {
            contents,
            target_parent: target_parent.into(),
            cursor,
            applied: None,
        }
    }

    /// Ids created by the last execution, parents first.
    pub fn created(&self) -> &[NodeId] {
        self.applied.as_ref().map_or(&[], |a| a.created.as_slice())
    }

    /// Give every captured node a fresh id and re-point parents. Top-level
    /// nodes move under the target and are offset to the cursor.
    fn clone_nodes(&self, tree: &mut WidgetTree) -> Vec<(NodeSnapshot, bool)> {
        let roots = &self.contents.roots;
        let (min_col, min_row) = self
            .contents
            .nodes
            .iter()
            .filter(|n| roots.contains(&n.id))
            .fold((i32::MAX, i32::MAX), |(c, r), n| (c.min(n.rect.col), r.min(n.rect.row)));

        let mut renamed: HashMap<&str, NodeId> = HashMap::new();
        let mut out = Vec::with_capacity(self.contents.nodes.len());
        for snap in &self.contents.nodes {
            let fresh = tree.next_id(&snap.node_type);
            renamed.insert(&snap.id, fresh.clone());

            let is_top = roots.contains(&snap.id);
            let mut clone = snap.clone();
            clone.id = fresh.clone();
            if is_top {
                clone.parent_id = self.target_parent.clone();
                clone.rect = GridRect {
                    col: self.cursor.col + (snap.rect.col - min_col),
                    row: self.cursor.row + (snap.rect.row - min_row),
                    ..snap.rect
                };
            } else if let Some(parent) = renamed.get(snap.parent_id.as_str()) {
                clone.parent_id = parent.clone();
            }
            if clone.props.contains_key(NAME_PROP) {
                clone.props.insert(NAME_PROP.to_string(), Value::String(fresh));
            }
            out.push((clone, is_top));
        }
        out
    }

    fn rollback(tree: &mut WidgetTree, applied: &Applied) {
        tree.restore(&applied.displaced);
        for id in applied.tops.iter().rev() {
            if let Err(e) = tree.remove_widget(id) {
                tracing::warn!(node_id = %id, error = %e, "Paste rollback could not remove node");
            }
        }
    }
}

impl Execute for PasteCommand {
    fn name(&self) -> &'static str {
        "paste"
    }

    fn execute(&mut self, tree: &mut WidgetTree) -> CommandResult {
        if self.contents.is_empty() {
            return Ok(None);
        }
        tree.node(&self.target_parent)?;

        let clones = self.clone_nodes(tree);
        let mut applied = Applied::default();
        for (snap, is_top) in clones {
            let id = snap.id.clone();
            let rect = snap.rect;
            if let Err(e) = tree.insert_snapshot(snap) {
                Self::rollback(tree, &applied);
                return Err(e);
            }
            applied.created.push(id.clone());
            if is_top {
                applied.tops.push(id.clone());
                match tree.move_widget_into_grid(&id, rect) {
                    Ok(displaced) => {
                        for (moved, original) in displaced {
                            applied.displaced.entry(moved).or_insert(original);
                        }
                    }
                    Err(e) => {
                        Self::rollback(tree, &applied);
                        return Err(e);
                    }
                }
            }
        }

        let mut nodes = Vec::with_capacity(applied.created.len());
        for id in &applied.created {
            nodes.push(tree.snapshot_of(id)?);
        }
        let skip: Vec<&str> = applied.created.iter().map(String::as_str).collect();
        let side_effects = displaced_updates(tree, &applied.displaced, &skip);

        tracing::debug!(pasted = nodes.len(), target = %self.target_parent, "Pasted nodes");
        self.applied = Some(applied);
        Ok(Some(WirePayload::Insert(InsertBatch {
            nodes,
            side_effects,
        })))
    }
}

impl Undoable for PasteCommand {
    fn undo(&mut self, tree: &mut WidgetTree) -> CommandResult {
        let Some(applied) = self.applied.take() else {
            return Ok(None);
        };
        for id in &applied.tops {
            if let Err(e) = tree.node(id) {
                self.applied = Some(applied);
                return Err(e);
            }
        }

        Self::rollback(tree, &applied);
        let skip: Vec<&str> = applied.created.iter().map(String::as_str).collect();
        let side_effects = displaced_updates(tree, &applied.displaced, &skip);
        Ok(Some(WirePayload::Delete(DeleteBatch {
            nodes_id: applied.created.into_iter().rev().collect(),
            side_effects,
        })))
    }
}
