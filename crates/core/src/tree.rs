//! In-memory widget tree for one page.
//!
//! [`WidgetTree`] exclusively owns every [`Node`] on a page and keeps two
//! invariants after each public mutation completes:
//!
//! - tree: exactly one root (its `parent_id` is its own id), every other
//!   node has exactly one existing parent, child lists mirror `parent_id`;
//! - space: after [`WidgetTree::move_widget_into_grid`] no two siblings
//!   overlap, every canvas is tall enough for its children and nothing
//!   overhangs a fixed container.
//!
//! Content grids use uniform cells: a container's inner grid has as many
//! columns and rows as the container itself spans.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::CoreError;
use crate::grid::{resolve_parent_bounds, GridRect, GridSize, ParentPolicy};
use crate::node::{NewWidget, Node, NodeSnapshot, Props, NAME_PROP};
use crate::types::NodeId;

/// Original rectangles of every node a placement altered, in the order they
/// were first touched. Restoring it undoes the placement.
pub type Displacement = IndexMap<NodeId, GridRect>;

/// Rectangles of every node, used as a gesture baseline.
pub type RectIndex = HashMap<NodeId, GridRect>;

/// Upper bound on sibling pushes in one cascade.
const MAX_CASCADE_STEPS: usize = 10_000;

/// Default root canvas id for new pages.
pub const ROOT_ID: &str = "canvas";

/// Default root canvas width in columns.
pub const ROOT_COLUMNS: i32 = 32;

/// Lifecycle state of a node within an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Absent,
    Placed,
    BeingDragged,
    BeingResized,
}

/// Transient gesture a node can be under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Drag,
    Resize,
}

/// Node store for one page.
#[derive(Debug, Clone)]
pub struct WidgetTree {
    root_id: NodeId,
    nodes: HashMap<NodeId, Node>,
    sequences: HashMap<String, u32>,
    gestures: HashMap<NodeId, Gesture>,
}

impl WidgetTree {
    /// A tree holding only an empty root canvas.
    pub fn with_root(root_id: impl Into<NodeId>, columns: i32) -> Self {
        let root_id = root_id.into();
        let root = Node {
            id: root_id.clone(),
            node_type: "canvas".to_string(),
            parent_id: root_id.clone(),
            rect: GridRect::new(0, 0, columns.max(1), 0),
            is_canvas: true,
            column_width: None,
            props: Props::new(),
            nodes: Vec::new(),
        };
        Self {
            nodes: HashMap::from([(root_id.clone(), root)]),
            root_id,
            sequences: HashMap::new(),
            gestures: HashMap::new(),
        }
    }

    /// Rebuild a tree from flat snapshots (e.g. the server's tree).
    ///
    /// Children keep the relative order they have in `snapshots`.
    pub fn from_snapshots(
        snapshots: impl IntoIterator<Item = NodeSnapshot>,
    ) -> Result<Self, CoreError> {
        let snapshots: Vec<NodeSnapshot> = snapshots.into_iter().collect();

        let mut roots = snapshots.iter().filter(|s| s.is_root());
        let root_id = match (roots.next(), roots.next()) {
            (Some(root), None) => root.id.clone(),
            (None, _) => return Err(CoreError::Validation("Page has no root node".into())),
            (Some(_), Some(_)) => {
                return Err(CoreError::Validation("Page has more than one root node".into()))
            }
        };

        let mut nodes = HashMap::with_capacity(snapshots.len());
        let mut order = Vec::with_capacity(snapshots.len());
        for snap in snapshots {
            if snap.id.is_empty() {
                return Err(CoreError::Validation("Node id must not be empty".into()));
            }
            order.push((snap.id.clone(), snap.parent_id.clone()));
            let id = snap.id.clone();
            if nodes.insert(id.clone(), node_from_snapshot(snap)).is_some() {
                return Err(CoreError::Conflict(format!("Duplicate node id '{id}'")));
            }
        }

        for (id, parent_id) in &order {
            if id == parent_id {
                continue;
            }
            match nodes.get_mut(parent_id) {
                Some(parent) => parent.nodes.push(id.clone()),
                None => return Err(CoreError::node_not_found(parent_id)),
            }
        }

        let tree = Self {
            root_id,
            nodes,
            sequences: HashMap::new(),
            gestures: HashMap::new(),
        };
        tree.check_acyclic()?;
        Ok(tree)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Like [`get`](Self::get) but reports a missing node as an error.
    pub fn node(&self, id: &str) -> Result<&Node, CoreError> {
        self.nodes.get(id).ok_or_else(|| CoreError::node_not_found(id))
    }

    pub fn children(&self, id: &str) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.nodes.as_slice()).unwrap_or(&[])
    }

    /// Whether `candidate` lies strictly below `ancestor`.
    pub fn is_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        let mut current = match self.nodes.get(candidate) {
            Some(node) => node,
            None => return false,
        };
        while !current.is_root() {
            if current.parent_id == ancestor {
                return true;
            }
            current = match self.nodes.get(&current.parent_id) {
                Some(parent) => parent,
                None => return false,
            };
        }
        false
    }

    /// Index of `id` in its parent's child list.
    pub fn child_position(&self, id: &str) -> Option<usize> {
        let node = self.nodes.get(id)?;
        if node.is_root() {
            return None;
        }
        self.children(&node.parent_id).iter().position(|c| c == id)
    }

    /// `ids` without the ones nested under another member, first occurrence
    /// order kept. Unknown ids are kept so callers can report them.
    pub fn outermost(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::with_capacity(ids.len());
        for id in ids {
            let nested = ids
                .iter()
                .any(|other| other != id && self.is_descendant(id, other));
            if !nested && !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// `id` and all of its descendants, children before parents.
    pub fn subtree_post_order(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_post_order(id, &mut out);
        out
    }

    fn collect_post_order(&self, id: &str, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(id) {
            for child in &node.nodes {
                self.collect_post_order(child, out);
            }
            out.push(node.id.clone());
        }
    }

    /// Every node, parents before children, siblings in child-list order.
    pub fn snapshot_widgets(&self) -> Vec<NodeSnapshot> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root_id.clone()]);
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(node.snapshot());
                queue.extend(node.nodes.iter().cloned());
            }
        }
        out
    }

    pub fn snapshot_of(&self, id: &str) -> Result<NodeSnapshot, CoreError> {
        Ok(self.node(id)?.snapshot())
    }

    /// Rectangle of every node.
    pub fn rect_index(&self) -> RectIndex {
        self.nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.rect))
            .collect()
    }

    pub fn node_state(&self, id: &str) -> NodeState {
        if !self.nodes.contains_key(id) {
            return NodeState::Absent;
        }
        match self.gestures.get(id) {
            Some(Gesture::Drag) => NodeState::BeingDragged,
            Some(Gesture::Resize) => NodeState::BeingResized,
            None => NodeState::Placed,
        }
    }

    /// Content grid of a container.
    fn content_size(&self, id: &str) -> GridSize {
        self.nodes
            .get(id)
            .map(|n| n.rect.size())
            .unwrap_or_default()
    }

    /// Absolute origin of a container's content grid.
    fn content_origin(&self, id: &str) -> (i32, i32) {
        let mut col = 0;
        let mut row = 0;
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            col += node.rect.col;
            row += node.rect.row;
            if node.is_root() {
                break;
            }
            current = self.nodes.get(&node.parent_id);
        }
        (col, row)
    }

    // -----------------------------------------------------------------------
    // Structural mutations
    // -----------------------------------------------------------------------

    /// Next free id for `node_type`, e.g. `button1`, `button2`.
    pub fn next_id(&mut self, node_type: &str) -> NodeId {
        let counter = self.sequences.entry(node_type.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{node_type}{counter}");
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Insert a new node and append it to its parent's child list.
    ///
    /// The node lands exactly at `widget.rect`; callers run
    /// [`move_widget_into_grid`](Self::move_widget_into_grid) afterwards to
    /// resolve collisions.
    pub fn add_widget(&mut self, widget: NewWidget) -> Result<&Node, CoreError> {
        if !self.nodes.contains_key(&widget.parent_id) {
            return Err(CoreError::node_not_found(&widget.parent_id));
        }
        let id = match widget.id {
            Some(id) if id.is_empty() => {
                return Err(CoreError::Validation("Node id must not be empty".into()))
            }
            Some(id) => id,
            None => self.next_id(&widget.node_type),
        };
        if self.nodes.contains_key(&id) {
            return Err(CoreError::Conflict(format!("Node '{id}' already exists")));
        }

        let node = Node {
            id: id.clone(),
            node_type: widget.node_type,
            parent_id: widget.parent_id.clone(),
            rect: widget.rect,
            is_canvas: widget.is_canvas,
            column_width: None,
            props: widget.props,
            nodes: Vec::new(),
        };
        self.attach(node);
        tracing::debug!(node_id = %id, parent_id = %widget.parent_id, "Widget added");
        self.node(&id)
    }

    /// Re-insert a node captured by a previous snapshot. The parent must
    /// already be present.
    pub fn insert_snapshot(&mut self, snapshot: NodeSnapshot) -> Result<(), CoreError> {
        self.insert_snapshot_at(snapshot, None)
    }

    /// Like [`insert_snapshot`](Self::insert_snapshot), placing the node at
    /// `position` in its parent's child list (appended when `None` or out of
    /// range).
    pub fn insert_snapshot_at(
        &mut self,
        snapshot: NodeSnapshot,
        position: Option<usize>,
    ) -> Result<(), CoreError> {
        if snapshot.is_root() {
            return Err(CoreError::Validation("A page has exactly one root".into()));
        }
        if !self.nodes.contains_key(&snapshot.parent_id) {
            return Err(CoreError::node_not_found(&snapshot.parent_id));
        }
        if self.nodes.contains_key(&snapshot.id) {
            return Err(CoreError::Conflict(format!(
                "Node '{}' already exists",
                snapshot.id
            )));
        }
        let node = node_from_snapshot(snapshot);
        if let Some(parent) = self.nodes.get_mut(&node.parent_id) {
            let at = position.unwrap_or(usize::MAX).min(parent.nodes.len());
            parent.nodes.insert(at, node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn attach(&mut self, node: Node) {
        if let Some(parent) = self.nodes.get_mut(&node.parent_id) {
            parent.nodes.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    /// Remove `id` and its whole subtree.
    ///
    /// Returns the removed nodes children-first, so a caller can undo by
    /// re-inserting them in reverse.
    pub fn remove_widget(&mut self, id: &str) -> Result<Vec<NodeSnapshot>, CoreError> {
        let node = self.node(id)?;
        if node.is_root() {
            return Err(CoreError::Validation("The root node cannot be deleted".into()));
        }
        let parent_id = node.parent_id.clone();

        let order = self.subtree_post_order(id);
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.nodes.retain(|child| child != id);
        }
        let removed: Vec<NodeSnapshot> = order
            .iter()
            .filter_map(|nid| {
                self.gestures.remove(nid);
                self.nodes.remove(nid).map(|n| n.snapshot())
            })
            .collect();

        tracing::debug!(node_id = %id, removed = removed.len(), "Widget subtree removed");
        Ok(removed)
    }

    /// Reparent `id` under `new_parent_id` keeping its absolute position;
    /// the rectangle is re-expressed relative to the new parent.
    pub fn move_widget(&mut self, id: &str, new_parent_id: &str) -> Result<(), CoreError> {
        let node = self.node(id)?;
        if node.is_root() {
            return Err(CoreError::Validation("The root node cannot be moved".into()));
        }
        if !self.nodes.contains_key(new_parent_id) {
            return Err(CoreError::node_not_found(new_parent_id));
        }
        if new_parent_id == id || self.is_descendant(new_parent_id, id) {
            return Err(CoreError::Validation(format!(
                "Cannot move '{id}' into its own descendant '{new_parent_id}'"
            )));
        }
        let old_parent_id = node.parent_id.clone();
        if old_parent_id == new_parent_id {
            return Ok(());
        }

        let (old_col, old_row) = self.content_origin(&old_parent_id);
        let (new_col, new_row) = self.content_origin(new_parent_id);

        if let Some(old_parent) = self.nodes.get_mut(&old_parent_id) {
            old_parent.nodes.retain(|child| child != id);
        }
        if let Some(new_parent) = self.nodes.get_mut(new_parent_id) {
            new_parent.nodes.push(id.to_string());
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = new_parent_id.to_string();
            node.rect = node.rect.translate(old_col - new_col, old_row - new_row);
        }
        Ok(())
    }

    /// Change a node's id. Children and the parent's child list follow.
    pub fn rename(&mut self, id: &str, new_id: &str) -> Result<(), CoreError> {
        if new_id.is_empty() {
            return Err(CoreError::Validation("Node id must not be empty".into()));
        }
        if id == new_id {
            return Ok(());
        }
        if self.nodes.contains_key(new_id) {
            return Err(CoreError::Conflict(format!("Node '{new_id}' already exists")));
        }
        let mut node = self
            .nodes
            .remove(id)
            .ok_or_else(|| CoreError::node_not_found(id))?;

        let was_root = node.is_root();
        node.id = new_id.to_string();
        if was_root {
            node.parent_id = new_id.to_string();
            self.root_id = new_id.to_string();
        } else if let Some(parent) = self.nodes.get_mut(&node.parent_id) {
            for child in parent.nodes.iter_mut().filter(|c| *c == id) {
                *child = new_id.to_string();
            }
        }
        if node.props.contains_key(NAME_PROP) {
            node.props
                .insert(NAME_PROP.to_string(), Value::String(new_id.to_string()));
        }
        for child in &node.nodes {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent_id = new_id.to_string();
            }
        }
        if let Some(gesture) = self.gestures.remove(id) {
            self.gestures.insert(new_id.to_string(), gesture);
        }
        self.nodes.insert(new_id.to_string(), node);
        Ok(())
    }

    /// Set one prop, returning the previous value.
    pub fn set_prop(&mut self, id: &str, key: &str, value: Value) -> Result<Option<Value>, CoreError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::node_not_found(id))?;
        Ok(node.props.insert(key.to_string(), value))
    }

    /// Remove one prop, returning the previous value.
    pub fn remove_prop(&mut self, id: &str, key: &str) -> Result<Option<Value>, CoreError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::node_not_found(id))?;
        Ok(node.props.remove(key))
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Overwrite a rectangle without collision handling. Returns the old one.
    pub fn set_rect(&mut self, id: &str, rect: GridRect) -> Result<GridRect, CoreError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::node_not_found(id))?;
        Ok(std::mem::replace(&mut node.rect, rect))
    }

    /// Put back every rectangle recorded in `displacement`.
    pub fn restore(&mut self, displacement: &Displacement) {
        for (id, rect) in displacement {
            if let Some(node) = self.nodes.get_mut(id) {
                node.rect = *rect;
            }
        }
    }

    /// Reset every node still present to its rectangle in `index`.
    pub fn restore_rects(&mut self, index: &RectIndex) {
        for (id, node) in self.nodes.iter_mut() {
            if let Some(rect) = index.get(id) {
                node.rect = *rect;
            }
        }
    }

    /// Place `id` at `proposed` and restore the spatial invariants.
    ///
    /// 1. Clamp into the parent (canvases may grow, fixed containers clamp).
    /// 2. Push overlapping siblings down, transitively. Candidates at one
    ///    step are handled in ascending `row`, then `col`, then id.
    /// 3. Grow the parent canvas, and its ancestor canvases, to fit.
    ///
    /// Returns the original rectangle of every node that changed. When the
    /// result would leave a node outside a fixed container (a cascade or a
    /// grown canvas running past its bottom edge) nothing is changed and a
    /// [`CoreError::Validation`] is returned.
    pub fn move_widget_into_grid(
        &mut self,
        id: &str,
        proposed: GridRect,
    ) -> Result<Displacement, CoreError> {
        let node = self.node(id)?;
        if node.is_root() {
            return Err(CoreError::Validation(
                "The root node has no parent grid".into(),
            ));
        }
        let parent_id = node.parent_id.clone();
        let parent = self.node(&parent_id)?;
        let policy = if parent.is_canvas {
            ParentPolicy::Grow
        } else {
            ParentPolicy::Clamp
        };
        let bounded = resolve_parent_bounds(proposed, self.content_size(&parent_id), policy);

        let mut displaced = Displacement::new();
        self.record_and_set(&mut displaced, id, bounded.rect);
        self.cascade(&parent_id, id, &mut displaced);
        self.grow_ancestors(&parent_id, &mut displaced);

        if let Err(e) = self.check_fit(&displaced) {
            self.restore(&displaced);
            return Err(e);
        }

        tracing::trace!(node_id = %id, displaced = displaced.len(), "Placed widget into grid");
        Ok(displaced)
    }

    /// Resize a canvas container directly. The canvas never shrinks below
    /// what its children need; siblings are pushed like any other placement.
    pub fn resize_canvas(&mut self, id: &str, dims: GridSize) -> Result<Displacement, CoreError> {
        let node = self.node(id)?;
        if !node.is_canvas {
            return Err(CoreError::Validation(format!("Node '{id}' is not a canvas")));
        }
        let (min_columns, min_rows) = node
            .nodes
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .fold((1, 0), |(cols, rows), c| {
                (cols.max(c.rect.right()), rows.max(c.rect.bottom()))
            });
        let size = GridSize {
            columns: dims.columns.max(min_columns),
            rows: dims.rows.max(min_rows),
        };
        let proposed = node.rect.with_size(size);

        if node.is_root() {
            let mut displaced = Displacement::new();
            self.record_and_set(&mut displaced, id, proposed);
            return Ok(displaced);
        }
        self.move_widget_into_grid(id, proposed)
    }

    fn record_and_set(&mut self, displaced: &mut Displacement, id: &str, rect: GridRect) {
        if let Some(node) = self.nodes.get_mut(id) {
            if node.rect != rect {
                displaced.entry(id.to_string()).or_insert(node.rect);
                node.rect = rect;
            }
        }
    }

    /// Push siblings of `mover` under `parent_id` down until none overlap.
    /// `mover` itself never moves.
    fn cascade(&mut self, parent_id: &str, mover: &str, displaced: &mut Displacement) {
        let siblings: Vec<NodeId> = self.children(parent_id).to_vec();
        let mut queue = VecDeque::from([mover.to_string()]);
        let mut steps = 0usize;

        while let Some(pusher) = queue.pop_front() {
            let pusher_rect = match self.nodes.get(&pusher) {
                Some(node) => node.rect,
                None => continue,
            };

            let mut hits: Vec<(GridRect, NodeId)> = siblings
                .iter()
                .filter(|sib| **sib != pusher && *sib != mover)
                .filter_map(|sib| self.nodes.get(sib))
                .filter(|sib| sib.rect.overlaps(&pusher_rect))
                .map(|sib| (sib.rect, sib.id.clone()))
                .collect();
            hits.sort_by(|(a, a_id), (b, b_id)| {
                (a.row, a.col, a_id).cmp(&(b.row, b.col, b_id))
            });

            for (rect, sib) in hits {
                steps += 1;
                if steps > MAX_CASCADE_STEPS {
                    tracing::warn!(parent_id = %parent_id, "Collision cascade hit its step limit");
                    return;
                }
                let pushed = GridRect {
                    row: pusher_rect.bottom(),
                    ..rect
                };
                self.record_and_set(displaced, &sib, pushed);
                queue.push_back(sib);
            }
        }
    }

    /// Every changed node must still lie inside its parent, and every
    /// changed container must still hold its children.
    fn check_fit(&self, changed: &Displacement) -> Result<(), CoreError> {
        for id in changed.keys() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.is_root() {
                if let Some(parent) = self.nodes.get(&node.parent_id) {
                    fits_inside(node, parent)?;
                }
            }
            for child in node.nodes.iter().filter_map(|c| self.nodes.get(c)) {
                fits_inside(child, node)?;
            }
        }
        Ok(())
    }

    /// Grow `container_id` and its ancestor canvases to fit their children.
    fn grow_ancestors(&mut self, container_id: &str, displaced: &mut Displacement) {
        let mut current = container_id.to_string();
        loop {
            let node = match self.nodes.get(&current) {
                Some(node) if node.is_canvas => node,
                _ => return,
            };
            let needed = node
                .nodes
                .iter()
                .filter_map(|c| self.nodes.get(c))
                .map(|c| c.rect.bottom())
                .max()
                .unwrap_or(0);
            if needed <= node.rect.rows_count {
                return;
            }
            let grown = GridRect {
                rows_count: needed,
                ..node.rect
            };
            let is_root = node.is_root();
            let parent_id = node.parent_id.clone();

            self.record_and_set(displaced, &current, grown);
            if is_root {
                return;
            }
            self.cascade(&parent_id, &current, displaced);
            current = parent_id;
        }
    }

    // -----------------------------------------------------------------------
    // Gestures
    // -----------------------------------------------------------------------

    pub fn begin_gesture(&mut self, id: &str, gesture: Gesture) -> Result<(), CoreError> {
        let node = self.node(id)?;
        if node.is_root() {
            return Err(CoreError::Validation("The root node cannot be dragged or resized".into()));
        }
        if let Some(active) = self.gestures.get(id) {
            return Err(CoreError::Conflict(format!(
                "Node '{id}' is already in a {active:?} gesture"
            )));
        }
        self.gestures.insert(id.to_string(), gesture);
        Ok(())
    }

    pub fn end_gesture(&mut self, id: &str) {
        self.gestures.remove(id);
    }

    // -----------------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------------

    fn check_acyclic(&self) -> Result<(), CoreError> {
        for node in self.nodes.values() {
            let mut current = node;
            let mut hops = 0;
            while !current.is_root() {
                hops += 1;
                if hops > self.nodes.len() {
                    return Err(CoreError::Validation(format!(
                        "Node '{}' is not connected to the root",
                        node.id
                    )));
                }
                current = self.node(&current.parent_id)?;
            }
        }
        Ok(())
    }

    /// Check the tree and spatial invariants. Intended for tests and debug
    /// assertions.
    pub fn validate(&self) -> Result<(), CoreError> {
        let roots = self.nodes.values().filter(|n| n.is_root()).count();
        if roots != 1 || !self.nodes.get(&self.root_id).is_some_and(Node::is_root) {
            return Err(CoreError::Internal(format!("Expected one root, found {roots}")));
        }
        self.check_acyclic()?;

        for node in self.nodes.values() {
            if !node.is_root() {
                let parent = self.node(&node.parent_id)?;
                let listed = parent.nodes.iter().filter(|c| **c == node.id).count();
                if listed != 1 {
                    return Err(CoreError::Internal(format!(
                        "Node '{}' listed {listed} times under '{}'",
                        node.id, parent.id
                    )));
                }
            }
            for child in &node.nodes {
                if self.nodes.get(child).map(|c| c.parent_id.as_str()) != Some(node.id.as_str()) {
                    return Err(CoreError::Internal(format!(
                        "Child list of '{}' names '{child}' which is not its child",
                        node.id
                    )));
                }
            }
            let kids: Vec<&Node> = node.nodes.iter().filter_map(|c| self.nodes.get(c)).collect();
            for kid in &kids {
                fits_inside(kid, node).map_err(|e| CoreError::Internal(e.to_string()))?;
            }
            for (i, a) in kids.iter().enumerate() {
                for b in &kids[i + 1..] {
                    if a.rect.overlaps(&b.rect) {
                        return Err(CoreError::Internal(format!(
                            "Siblings '{}' and '{}' overlap",
                            a.id, b.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A child never overhangs its parent's columns. Rows are only bounded for
/// fixed containers; canvases grow instead.
fn fits_inside(child: &Node, parent: &Node) -> Result<(), CoreError> {
    if child.rect.right() > parent.rect.columns_count {
        return Err(CoreError::Validation(format!(
            "'{}' overhangs the {} columns of '{}'",
            child.id, parent.rect.columns_count, parent.id
        )));
    }
    if !parent.is_canvas && child.rect.bottom() > parent.rect.rows_count {
        return Err(CoreError::Validation(format!(
            "'{}' does not fit in the {} rows of '{}'",
            child.id, parent.rect.rows_count, parent.id
        )));
    }
    Ok(())
}

fn node_from_snapshot(snap: NodeSnapshot) -> Node {
    Node {
        id: snap.id,
        node_type: snap.node_type,
        parent_id: snap.parent_id,
        rect: snap.rect,
        is_canvas: snap.is_canvas,
        column_width: snap.column_width,
        props: snap.props,
        nodes: Vec::new(),
    }
}
