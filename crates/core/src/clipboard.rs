//! Copied subtrees waiting to be pasted.

use crate::error::CoreError;
use crate::node::NodeSnapshot;
use crate::tree::WidgetTree;
use crate::types::NodeId;

/// Subtrees captured from a tree, parents before children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipboardContents {
    /// Top-level captured ids. None of them is nested under another.
    pub roots: Vec<NodeId>,
    pub nodes: Vec<NodeSnapshot>,
}

impl ClipboardContents {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Session clipboard.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    contents: Option<ClipboardContents>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<&ClipboardContents> {
        self.contents.as_ref()
    }

    pub fn set(&mut self, contents: ClipboardContents) {
        self.contents = Some(contents);
    }

    pub fn clear(&mut self) {
        self.contents = None;
    }

    /// Capture the subtrees rooted at `ids`.
    ///
    /// Ids nested under another captured id are folded into that subtree.
    /// The root cannot be captured.
    pub fn capture(tree: &WidgetTree, ids: &[NodeId]) -> Result<ClipboardContents, CoreError> {
        for id in ids {
            if tree.node(id)?.is_root() {
                return Err(CoreError::Validation("The root node cannot be copied".into()));
            }
        }

        let roots = tree.outermost(ids);

        let mut nodes = Vec::new();
        for root in &roots {
            collect_pre_order(tree, root, &mut nodes);
        }
        Ok(ClipboardContents { roots, nodes })
    }
}

fn collect_pre_order(tree: &WidgetTree, id: &str, out: &mut Vec<NodeSnapshot>) {
    if let Some(node) = tree.get(id) {
        out.push(node.snapshot());
        for child in &node.nodes {
            collect_pre_order(tree, child, out);
        }
    }
}
