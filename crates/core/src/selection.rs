//! Page-scoped set of selected node ids.

use crate::tree::WidgetTree;
use crate::types::NodeId;

/// Currently selected nodes, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Apply a click on `id`.
    ///
    /// A click on the root clears the selection. A plain click selects only
    /// `id`. A shift-click toggles `id` when every selected node shares its
    /// parent, and otherwise replaces the selection.
    pub fn click(&mut self, tree: &WidgetTree, id: &str, shift: bool) {
        let node = match tree.get(id) {
            Some(node) => node,
            None => return,
        };
        if node.is_root() {
            self.ids.clear();
            return;
        }

        let same_parent = !self.ids.is_empty()
            && self
                .ids
                .iter()
                .all(|s| tree.get(s).is_some_and(|n| n.parent_id == node.parent_id));

        if shift && same_parent {
            if let Some(pos) = self.ids.iter().position(|s| s == id) {
                self.ids.remove(pos);
            } else {
                self.ids.push(id.to_string());
            }
        } else {
            self.ids = vec![id.to_string()];
        }
    }

    /// Drop ids that no longer exist (after delete, cut or undo).
    pub fn retain_existing(&mut self, tree: &WidgetTree) {
        self.ids.retain(|id| tree.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridRect;
    use crate::node::NewWidget;

    fn tree() -> WidgetTree {
        let mut tree = WidgetTree::with_root("R", 32);
        for (id, col) in [("a", 0), ("b", 4)] {
            tree.add_widget(NewWidget::new("text", "R", GridRect::new(col, 0, 2, 1)).with_id(id))
                .unwrap();
        }
        tree.add_widget(
            NewWidget::new("container", "R", GridRect::new(8, 0, 8, 8))
                .with_id("box")
                .canvas(),
        )
        .unwrap();
        tree.add_widget(NewWidget::new("text", "box", GridRect::new(0, 0, 2, 1)).with_id("inner"))
            .unwrap();
        tree
    }

    #[test]
    fn click_replaces_and_root_clears() {
        let tree = tree();
        let mut sel = Selection::new();
        sel.click(&tree, "a", false);
        sel.click(&tree, "b", false);
        assert_eq!(sel.ids(), ["b".to_string()]);

        sel.click(&tree, "R", true);
        assert!(sel.is_empty());
    }

    #[test]
    fn shift_click_toggles_siblings() {
        let tree = tree();
        let mut sel = Selection::new();
        sel.click(&tree, "a", false);
        sel.click(&tree, "b", true);
        assert_eq!(sel.ids(), ["a".to_string(), "b".to_string()]);

        sel.click(&tree, "a", true);
        assert_eq!(sel.ids(), ["b".to_string()]);
    }

    #[test]
    fn shift_click_across_parents_replaces() {
        let tree = tree();
        let mut sel = Selection::new();
        sel.click(&tree, "a", false);
        sel.click(&tree, "inner", true);
        assert_eq!(sel.ids(), ["inner".to_string()]);
    }

    #[test]
    fn unknown_ids_are_ignored_and_pruned() {
        let mut tree = tree();
        let mut sel = Selection::new();
        sel.click(&tree, "ghost", false);
        assert!(sel.is_empty());

        sel.click(&tree, "a", false);
        tree.remove_widget("a").unwrap();
        sel.retain_existing(&tree);
        assert!(sel.is_empty());
    }
}
