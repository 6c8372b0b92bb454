//! Resize as a continuous gesture: `start -> move* -> end | cancel`.
//!
//! Every recomputation starts from the rectangles captured at `start`, so
//! intermediate frames never accumulate drift. Pointer input goes through a
//! [`LatestRequest`] queue; only `end` is guaranteed to see the true final
//! rectangle.

use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::command::{Command, CommandResult, Execute, Undoable};
use crate::error::CoreError;
use crate::grid::GridRect;
use crate::node::PartialNodeUpdate;
use crate::throttle::LatestRequest;
use crate::tree::{Displacement, Gesture, RectIndex, WidgetTree};
use crate::types::NodeId;
use crate::wire::WirePayload;

/// An in-progress resize of one widget.
#[derive(Debug)]
pub struct ResizeGesture {
    id: NodeId,
    original: GridRect,
    baseline: RectIndex,
    pending: LatestRequest<GridRect>,
    last_frame: Option<GridRect>,
    frames: usize,
}

impl ResizeGesture {
    /// Capture the baseline and mark the widget as being resized.
    pub fn start(tree: &mut WidgetTree, id: &str, throttle: Duration) -> Result<Self, CoreError> {
        tree.begin_gesture(id, Gesture::Resize)?;
        let original = tree.node(id)?.rect;
        Ok(Self {
            id: id.to_string(),
            original,
            baseline: tree.rect_index(),
            pending: LatestRequest::new(throttle),
            last_frame: None,
            frames: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rectangle the widget had when the gesture started.
    pub fn original(&self) -> GridRect {
        self.original
    }

    /// Number of intermediate frames computed so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Record a new candidate rectangle. Replaces any candidate not yet
    /// computed.
    pub fn move_to(&mut self, candidate: GridRect) {
        self.pending.submit(candidate);
    }

    /// Recompute the layout for the latest candidate if the throttle allows.
    /// Returns whether the tree changed.
    ///
    /// A candidate that does not fit its container is skipped and the
    /// previous frame stays on screen.
    pub fn pump(&mut self, tree: &mut WidgetTree, now: Instant) -> Result<bool, CoreError> {
        let Some(candidate) = self.pending.poll(now) else {
            return Ok(false);
        };
        match self.apply(tree, candidate) {
            Ok(_) => {
                self.last_frame = Some(candidate);
                self.frames += 1;
                Ok(true)
            }
            Err(CoreError::Validation(reason)) => {
                tracing::debug!(node_id = %self.id, %reason, "Resize frame skipped");
                if let Some(last) = self.last_frame {
                    self.apply(tree, last)?;
                }
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Finish at `final_rect`. Yields no command when nothing moved.
    pub fn end(
        mut self,
        tree: &mut WidgetTree,
        final_rect: GridRect,
    ) -> Result<Option<Command>, CoreError> {
        self.pending.clear();
        let result = self.apply(tree, final_rect);
        tree.end_gesture(&self.id);
        let displaced = match result {
            Ok(displaced) => displaced,
            Err(e) => {
                tree.restore_rects(&self.baseline);
                return Err(e);
            }
        };
        if displaced.is_empty() {
            return Ok(None);
        }

        let after = displaced
            .keys()
            .filter_map(|id| tree.get(id).map(|n| (id.clone(), n.rect)))
            .collect();
        Ok(Some(Command::reversible(ResizeCommand {
            id: self.id,
            before: displaced,
            after,
        })))
    }

    /// Abandon the gesture and put every rectangle back. Emits nothing.
    pub fn cancel(self, tree: &mut WidgetTree) {
        tree.restore_rects(&self.baseline);
        tree.end_gesture(&self.id);
    }

    fn apply(&self, tree: &mut WidgetTree, candidate: GridRect) -> Result<Displacement, CoreError> {
        tree.restore_rects(&self.baseline);
        if tree.node(&self.id)?.is_canvas {
            tree.resize_canvas(&self.id, candidate.size())
        } else {
            tree.move_widget_into_grid(&self.id, candidate)
        }
    }
}

/// A finished resize: the rectangles every affected node had before and
/// after.
#[derive(Debug)]
pub struct ResizeCommand {
    id: NodeId,
    before: Displacement,
    after: IndexMap<NodeId, GridRect>,
}

impl ResizeCommand {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn apply(tree: &mut WidgetTree, rects: &IndexMap<NodeId, GridRect>) -> CommandResult {
        for id in rects.keys() {
            tree.node(id)?;
        }
        let mut updates = Vec::with_capacity(rects.len());
        for (id, rect) in rects {
            tree.set_rect(id, *rect)?;
            updates.push(PartialNodeUpdate::rect(id.clone(), *rect));
        }
        Ok(Some(WirePayload::Update(updates)))
    }
}

impl Execute for ResizeCommand {
    fn name(&self) -> &'static str {
        "resize"
    }

    /// The gesture already laid the tree out; this re-asserts the final
    /// rectangles and reports them.
    fn execute(&mut self, tree: &mut WidgetTree) -> CommandResult {
        Self::apply(tree, &self.after)
    }
}

impl Undoable for ResizeCommand {
    fn undo(&mut self, tree: &mut WidgetTree) -> CommandResult {
        Self::apply(tree, &self.before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{page_with_a, sorted_snapshot, widget};
    use crate::command::CommandStack;
    use crate::tree::NodeState;

    const THROTTLE: Duration = Duration::from_millis(16);

    /// `A` above `B` in a root already tall enough for both.
    fn page() -> WidgetTree {
        let mut tree = page_with_a();
        tree.add_widget(widget("B", "R", GridRect::new(0, 2, 4, 2)))
            .unwrap();
        tree.set_rect("R", GridRect::new(0, 0, 32, 4)).unwrap();
        tree
    }

    #[test]
    fn frames_start_from_the_baseline() {
        let mut tree = page();
        let start = Instant::now();
        let mut gesture = ResizeGesture::start(&mut tree, "A", THROTTLE).unwrap();
        assert_eq!(tree.node_state("A"), NodeState::BeingResized);

        gesture.move_to(GridRect::new(0, 0, 4, 5));
        assert!(gesture.pump(&mut tree, start).unwrap());
        assert_eq!(tree.node("B").unwrap().rect.row, 5);

        // Shrinking back must bring B home, not leave it at row 5.
        gesture.move_to(GridRect::new(0, 0, 4, 2));
        assert!(gesture.pump(&mut tree, start + THROTTLE).unwrap());
        assert_eq!(tree.node("B").unwrap().rect.row, 2);
        assert_eq!(gesture.frames(), 2);
    }

    #[test]
    fn throttled_moves_coalesce() {
        let mut tree = page();
        let start = Instant::now();
        let mut gesture = ResizeGesture::start(&mut tree, "A", THROTTLE).unwrap();

        gesture.move_to(GridRect::new(0, 0, 5, 2));
        gesture.pump(&mut tree, start).unwrap();
        gesture.move_to(GridRect::new(0, 0, 6, 2));
        gesture.move_to(GridRect::new(0, 0, 7, 2));
        assert!(!gesture.pump(&mut tree, start + Duration::from_millis(1)).unwrap());
        assert_eq!(tree.node("A").unwrap().rect.columns_count, 5);

        assert!(gesture.pump(&mut tree, start + THROTTLE).unwrap());
        assert_eq!(tree.node("A").unwrap().rect.columns_count, 7);
    }

    #[test]
    fn end_uses_the_final_rect_and_undo_round_trips() {
        let mut tree = page();
        let before = sorted_snapshot(&tree);
        let start = Instant::now();
        let mut gesture = ResizeGesture::start(&mut tree, "A", THROTTLE).unwrap();
        gesture.move_to(GridRect::new(0, 0, 4, 3));
        gesture.pump(&mut tree, start).unwrap();
        // Never pumped; `end` still lands on the true final size.
        gesture.move_to(GridRect::new(0, 0, 4, 9));

        let cmd = gesture
            .end(&mut tree, GridRect::new(0, 0, 6, 4))
            .unwrap()
            .unwrap();
        assert_eq!(tree.node_state("A"), NodeState::Placed);
        assert_eq!(tree.node("A").unwrap().rect, GridRect::new(0, 0, 6, 4));
        assert_eq!(tree.node("B").unwrap().rect.row, 4);

        let mut stack = CommandStack::new(Vec::new());
        stack.execute_command(&mut tree, Some(cmd)).unwrap();
        match &stack.sink()[0] {
            WirePayload::Update(updates) => {
                let ids: Vec<_> = updates.iter().map(|u| u.id.as_str()).collect();
                assert_eq!(ids, vec!["A", "B", "R"]);
            }
            other => panic!("Expected Update, got {other:?}"),
        }

        stack.undo_command(&mut tree).unwrap();
        assert_eq!(sorted_snapshot(&tree), before);
    }

    #[test]
    fn cancel_restores_and_emits_nothing() {
        let mut tree = page();
        let before = sorted_snapshot(&tree);
        let mut gesture = ResizeGesture::start(&mut tree, "A", THROTTLE).unwrap();
        gesture.move_to(GridRect::new(0, 0, 10, 10));
        gesture.pump(&mut tree, Instant::now()).unwrap();
        assert_ne!(sorted_snapshot(&tree), before);

        gesture.cancel(&mut tree);
        assert_eq!(sorted_snapshot(&tree), before);
        assert_eq!(tree.node_state("A"), NodeState::Placed);
    }

    #[test]
    fn end_without_change_yields_nothing() {
        let mut tree = page();
        let gesture = ResizeGesture::start(&mut tree, "A", THROTTLE).unwrap();
        let original = gesture.original();
        assert!(gesture.end(&mut tree, original).unwrap().is_none());
    }

    #[test]
    fn frame_that_overflows_a_fixed_container_keeps_the_previous_one() {
        let mut tree = WidgetTree::with_root("R", 32);
        tree.add_widget(widget("form", "R", GridRect::new(0, 0, 8, 4)))
            .unwrap();
        tree.add_widget(widget("top", "form", GridRect::new(0, 0, 4, 1)))
            .unwrap();
        tree.add_widget(widget("low", "form", GridRect::new(0, 1, 4, 2)))
            .unwrap();
        tree.set_rect("R", GridRect::new(0, 0, 32, 4)).unwrap();

        let start = Instant::now();
        let mut gesture = ResizeGesture::start(&mut tree, "top", THROTTLE).unwrap();
        gesture.move_to(GridRect::new(0, 0, 4, 2));
        assert!(gesture.pump(&mut tree, start).unwrap());
        assert_eq!(tree.node("low").unwrap().rect.row, 2);

        // Three rows for `top` would push `low` to rows 3..5 of a 4-row form.
        gesture.move_to(GridRect::new(0, 0, 4, 3));
        assert!(!gesture.pump(&mut tree, start + THROTTLE).unwrap());
        assert_eq!(tree.node("top").unwrap().rect.rows_count, 2);
        assert_eq!(tree.node("low").unwrap().rect.row, 2);
        assert_eq!(gesture.frames(), 1);
        tree.validate().unwrap();

        assert!(gesture.end(&mut tree, GridRect::new(0, 0, 4, 3)).is_err());
        assert_eq!(tree.node("top").unwrap().rect, GridRect::new(0, 0, 4, 1));
        assert_eq!(tree.node_state("top"), NodeState::Placed);
    }

    #[test]
    fn canvas_resize_keeps_room_for_children() {
        let mut tree = WidgetTree::with_root("R", 32);
        tree.add_widget(widget("box", "R", GridRect::new(0, 0, 8, 6)).canvas())
            .unwrap();
        tree.add_widget(widget("inner", "box", GridRect::new(0, 0, 6, 5)))
            .unwrap();

        let gesture = ResizeGesture::start(&mut tree, "box", THROTTLE).unwrap();
        gesture
            .end(&mut tree, GridRect::new(0, 0, 2, 2))
            .unwrap()
            .unwrap();
        assert_eq!(tree.node("box").unwrap().rect, GridRect::new(0, 0, 6, 5));
    }
}
