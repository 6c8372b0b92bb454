//! Drag and drop: moving existing widgets and dropping new ones from the
//! palette.

use crate::command::{displaced_updates, Command, CommandResult, Execute, Undoable};
use crate::error::CoreError;
use crate::grid::GridRect;
use crate::node::{NewWidget, PartialNodeUpdate};
use crate::tree::{Displacement, Gesture, WidgetTree};
use crate::types::NodeId;
use crate::wire::{DeleteBatch, InsertBatch, WirePayload};

#[derive(Debug)]
enum Source {
    Existing { id: NodeId },
    Palette { widget: NewWidget },
}

#[derive(Debug)]
struct Applied {
    id: NodeId,
    old_parent: NodeId,
    old_rect: GridRect,
    displaced: Displacement,
}

/// Drop of a widget at `proposed` inside `target_parent`.
#[derive(Debug)]
pub struct DragCommand {
    source: Source,
    target_parent: NodeId,
    proposed: GridRect,
    applied: Option<Applied>,
}

impl DragCommand {
    /// Move an existing widget, reparenting it if `target_parent` differs
    /// from its current parent.
    pub fn move_existing(
        id: impl Into<NodeId>,
        target_parent: impl Into<NodeId>,
        proposed: GridRect,
    ) -> Self {
        Self {
            source: Source::Existing { id: id.into() },
            target_parent: target_parent.into(),
            proposed,
            applied: None,
        }
    }

    /// Create `widget` and place it at its requested rectangle.
    pub fn from_palette(widget: NewWidget) -> Self {
        Self {
            target_parent: widget.parent_id.clone(),
            proposed: widget.rect,
            source: Source::Palette { widget },
            applied: None,
        }
    }

    /// Id of the dragged widget, known for palette drops once executed.
    pub fn node_id(&self) -> Option<&str> {
        match (&self.source, &self.applied) {
            (_, Some(applied)) => Some(&applied.id),
            (Source::Existing { id }, None) => Some(id),
            (Source::Palette { widget }, None) => widget.id.as_deref(),
        }
    }

    fn execute_existing(&mut self, tree: &mut WidgetTree, id: NodeId) -> CommandResult {
        let node = tree.node(&id)?;
        if node.is_root() {
            return Err(CoreError::Validation("The root node cannot be moved".into()));
        }
        let old_parent = node.parent_id.clone();
        let old_rect = node.rect;
        let reparent = old_parent != self.target_parent;

        if reparent {
            tree.move_widget(&id, &self.target_parent)?;
        }
        let displaced = match tree.move_widget_into_grid(&id, self.proposed) {
            Ok(displaced) => displaced,
            Err(e) => {
                if reparent {
                    tree.move_widget(&id, &old_parent)?;
                    tree.set_rect(&id, old_rect)?;
                }
                return Err(e);
            }
        };

        if !reparent && displaced.is_empty() {
            return Ok(None);
        }

        let mover = tree.node(&id)?;
        let mut updates = vec![PartialNodeUpdate {
            parent_id: reparent.then(|| self.target_parent.clone()),
            ..PartialNodeUpdate::rect(id.clone(), mover.rect)
        }];
        updates.extend(displaced_updates(tree, &displaced, &[id.as_str()]));

        self.applied = Some(Applied {
            id,
            old_parent,
            old_rect,
            displaced,
        });
        Ok(Some(WirePayload::Update(updates)))
    }

    fn execute_palette(&mut self, tree: &mut WidgetTree, widget: NewWidget) -> CommandResult {
        let id = tree.add_widget(widget)?.id.clone();
        let displaced = match tree.move_widget_into_grid(&id, self.proposed) {
            Ok(displaced) => displaced,
            Err(e) => {
                tree.remove_widget(&id)?;
                return Err(e);
            }
        };

        if let Source::Palette { widget } = &mut self.source {
            widget.id = Some(id.clone());
        }
        let batch = InsertBatch {
            nodes: vec![tree.snapshot_of(&id)?],
            side_effects: displaced_updates(tree, &displaced, &[id.as_str()]),
        };
        self.applied = Some(Applied {
            old_parent: self.target_parent.clone(),
            old_rect: self.proposed,
            id,
            displaced,
        });
        Ok(Some(WirePayload::Insert(batch)))
    }
}

impl Execute for DragCommand {
    fn name(&self) -> &'static str {
        match self.source {
            Source::Existing { .. } => "drag",
            Source::Palette { .. } => "drop_new",
        }
    }

    fn execute(&mut self, tree: &mut WidgetTree) -> CommandResult {
        tree.node(&self.target_parent)?;
        match &self.source {
            Source::Existing { id } => {
                let id = id.clone();
                self.execute_existing(tree, id)
            }
            Source::Palette { widget } => {
                let widget = widget.clone();
                self.execute_palette(tree, widget)
            }
        }
    }
}

impl Undoable for DragCommand {
    fn undo(&mut self, tree: &mut WidgetTree) -> CommandResult {
        let Some(applied) = self.applied.take() else {
            return Ok(None);
        };
        if let Err(e) = tree.node(&applied.id) {
            self.applied = Some(applied);
            return Err(e);
        }

        tree.restore(&applied.displaced);
        let side_effects = displaced_updates(tree, &applied.displaced, &[applied.id.as_str()]);

        match self.source {
            Source::Palette { .. } => {
                tree.remove_widget(&applied.id)?;
                Ok(Some(WirePayload::Delete(DeleteBatch {
                    nodes_id: vec![applied.id],
                    side_effects,
                })))
            }
            Source::Existing { .. } => {
                let reparented = tree.node(&applied.id)?.parent_id != applied.old_parent;
                if reparented {
                    tree.move_widget(&applied.id, &applied.old_parent)?;
                }
                tree.set_rect(&applied.id, applied.old_rect)?;

                let mut updates = vec![PartialNodeUpdate {
                    parent_id: reparented.then(|| applied.old_parent.clone()),
                    ..PartialNodeUpdate::rect(applied.id.clone(), applied.old_rect)
                }];
                updates.extend(side_effects);
                Ok(Some(WirePayload::Update(updates)))
            }
        }
    }
}

/// An in-progress drag of an existing widget.
///
/// While it lives the widget reports [`NodeState::BeingDragged`]. Both
/// [`cancel`](Self::cancel) and [`drop_at`](Self::drop_at) return it to
/// placed.
///
/// [`NodeState::BeingDragged`]: crate::tree::NodeState::BeingDragged
#[derive(Debug)]
pub struct DragGesture {
    id: NodeId,
}

impl DragGesture {
    pub fn start(tree: &mut WidgetTree, id: &str) -> Result<Self, CoreError> {
        tree.begin_gesture(id, Gesture::Drag)?;
        Ok(Self { id: id.to_string() })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Abandon the drag. Nothing was changed, so nothing is emitted.
    pub fn cancel(self, tree: &mut WidgetTree) {
        tree.end_gesture(&self.id);
    }

    /// Finish the drag over `target_parent` at `proposed`. Yields no command
    /// when the widget would stay where it is.
    pub fn drop_at(
        self,
        tree: &mut WidgetTree,
        target_parent: &str,
        proposed: GridRect,
    ) -> Option<Command> {
        tree.end_gesture(&self.id);
        let unchanged = tree
            .get(&self.id)
            .is_some_and(|n| n.parent_id == target_parent && n.rect == proposed);
        if unchanged {
            return None;
        }
        Some(Command::reversible(DragCommand::move_existing(
            self.id,
            target_parent,
            proposed,
        )))
    }
}
