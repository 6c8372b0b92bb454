//! Subtree deletion (also used for cut).

use std::collections::HashMap;

use crate::command::{CommandResult, Execute, Undoable};
use crate::error::CoreError;
use crate::node::NodeSnapshot;
use crate::tree::WidgetTree;
use crate::types::NodeId;
use crate::wire::{DeleteBatch, InsertBatch, WirePayload};

#[derive(Debug)]
struct Removed {
    position: Option<usize>,
    /// Children before parents, as returned by the tree.
    nodes: Vec<NodeSnapshot>,
}

/// Delete the given nodes together with everything below them.
#[derive(Debug)]
pub struct DeleteCommand {
    ids: Vec<NodeId>,
    removed: Vec<Removed>,
}

impl DeleteCommand {
    pub fn new(ids: Vec<NodeId>) -> Self {
        Self {
            ids,
            removed: Vec::new(),
        }
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }
}

impl Execute for DeleteCommand {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn execute(&mut self, tree: &mut WidgetTree) -> CommandResult {
        if self.ids.is_empty() {
            return Ok(None);
        }
        for id in &self.ids {
            if tree.node(id)?.is_root() {
                return Err(CoreError::Validation("The root node cannot be deleted".into()));
            }
        }

        let mut removed = Vec::new();
        for id in tree.outermost(&self.ids) {
            let position = tree.child_position(&id);
            let nodes = tree.remove_widget(&id)?;
            removed.push(Removed { position, nodes });
        }

        let nodes_id = removed
            .iter()
            .flat_map(|r| r.nodes.iter().map(|n| n.id.clone()))
            .collect();
        self.removed = removed;
        Ok(Some(WirePayload::Delete(DeleteBatch {
            nodes_id,
            side_effects: Vec::new(),
        })))
    }
}

impl Undoable for DeleteCommand {
    /// Re-insert every removed node, parents before children, in the reverse
    /// order the subtrees were removed.
    fn undo(&mut self, tree: &mut WidgetTree) -> CommandResult {
        if self.removed.is_empty() {
            return Ok(None);
        }
        for group in &self.removed {
            if let Some(top) = group.nodes.last() {
                tree.node(&top.parent_id)?;
            }
        }

        let mut inserted = Vec::new();
        for group in self.removed.drain(..).rev() {
            let mut first = true;
            for snapshot in parent_first(group.nodes) {
                let position = if first { group.position } else { None };
                first = false;
                inserted.push(snapshot.clone());
                tree.insert_snapshot_at(snapshot, position)?;
            }
        }

        Ok(Some(WirePayload::Insert(InsertBatch {
            nodes: inserted,
            side_effects: Vec::new(),
        })))
    }
}

/// Reorder a removed subtree so every parent precedes its children while
/// siblings keep their relative order.
fn parent_first(post_order: Vec<NodeSnapshot>) -> Vec<NodeSnapshot> {
    let mut depth: HashMap<NodeId, usize> = HashMap::with_capacity(post_order.len());
    for snap in post_order.iter().rev() {
        let d = depth.get(&snap.parent_id).map_or(0, |d| d + 1);
        depth.insert(snap.id.clone(), d);
    }
    let mut ordered = post_order;
    ordered.sort_by_key(|snap| depth.get(&snap.id).copied().unwrap_or(0));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{sorted_snapshot, widget};
    use crate::grid::GridRect;
    use assert_matches::assert_matches;

    /// Root `R` with `A` (children `A1`, `A2`) and `B`.
    fn page() -> WidgetTree {
        let mut tree = WidgetTree::with_root("R", 32);
        tree.add_widget(widget("A", "R", GridRect::new(0, 0, 8, 4)).canvas())
            .unwrap();
        tree.add_widget(widget("B", "R", GridRect::new(8, 0, 4, 2)))
            .unwrap();
        tree.add_widget(widget("A1", "A", GridRect::new(0, 0, 2, 2)))
            .unwrap();
        tree.add_widget(widget("A2", "A", GridRect::new(2, 0, 2, 2)))
            .unwrap();
        tree
    }

    #[test]
    fn delete_sends_post_order_and_undo_inserts_parents_first() {
        let mut tree = page();
        let before = tree.snapshot_widgets();

        let mut cmd = DeleteCommand::new(vec!["A".into()]);
        match cmd.execute(&mut tree).unwrap().unwrap() {
            WirePayload::Delete(batch) => assert_eq!(batch.nodes_id, vec!["A1", "A2", "A"]),
            other => panic!("Expected Delete, got {other:?}"),
        }
        assert!(!tree.contains("A1"));
        assert!(tree
            .snapshot_widgets()
            .iter()
            .all(|n| !["A", "A1", "A2"].contains(&n.parent_id.as_str())));

        match cmd.undo(&mut tree).unwrap().unwrap() {
            WirePayload::Insert(batch) => {
                let ids: Vec<_> = batch.nodes.iter().map(|n| n.id.as_str()).collect();
                assert_eq!(ids, vec!["A", "A1", "A2"]);
            }
            other => panic!("Expected Insert, got {other:?}"),
        }
        // Child-list order is restored too.
        assert_eq!(tree.snapshot_widgets(), before);
        tree.validate().unwrap();
    }

    #[test]
    fn nested_selection_is_folded() {
        let mut tree = page();
        let before = sorted_snapshot(&tree);
        let mut cmd = DeleteCommand::new(vec!["A1".into(), "A".into(), "B".into()]);
        match cmd.execute(&mut tree).unwrap().unwrap() {
            WirePayload::Delete(batch) => assert_eq!(batch.nodes_id, vec!["A1", "A2", "A", "B"]),
            other => panic!("Expected Delete, got {other:?}"),
        }
        assert_eq!(tree.len(), 1);

        cmd.undo(&mut tree).unwrap();
        assert_eq!(sorted_snapshot(&tree), before);
    }

    #[test]
    fn root_in_selection_fails_before_anything_changes() {
        let mut tree = page();
        let before = sorted_snapshot(&tree);
        let mut cmd = DeleteCommand::new(vec!["B".into(), "R".into()]);
        assert_matches!(cmd.execute(&mut tree), Err(CoreError::Validation(_)));
        assert_eq!(sorted_snapshot(&tree), before);

        let mut cmd = DeleteCommand::new(vec!["B".into(), "ghost".into()]);
        assert_matches!(cmd.execute(&mut tree), Err(CoreError::NotFound { .. }));
        assert!(tree.contains("B"));
    }

    #[test]
    fn parent_first_keeps_sibling_order() {
        let mut tree = page();
        let removed = tree.remove_widget("A").unwrap();
        let ids: Vec<_> = parent_first(removed)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["A", "A1", "A2"]);
    }
}
