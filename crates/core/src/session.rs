//! One editing session: a page's tree plus everything that acts on it.
//!
//! A session is an explicit value owned by whoever hosts the editor, so
//! several sessions (one per page, or one per test) never share state.

use std::time::Duration;

use serde_json::Value;

use crate::clipboard::Clipboard;
use crate::command::{
    ChangePropCommand, Command, CommandStack, DeleteCommand, DragCommand, DragGesture,
    PasteCommand, PayloadSink, ResizeGesture,
};
use crate::error::CoreError;
use crate::grid::GridPoint;
use crate::node::{NewWidget, NAME_PROP};
use crate::selection::Selection;
use crate::tree::WidgetTree;

/// Editor tuning.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Minimum time between two resize recomputations.
    pub resize_throttle: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            resize_throttle: Duration::from_millis(16),
        }
    }
}

pub struct EditorSession<S> {
    tree: WidgetTree,
    commands: CommandStack<S>,
    selection: Selection,
    clipboard: Clipboard,
    config: EditorConfig,
}

impl<S: PayloadSink> EditorSession<S> {
    pub fn new(tree: WidgetTree, sink: S, config: EditorConfig) -> Self {
        Self {
            tree,
            commands: CommandStack::new(sink),
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            config,
        }
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    /// Mutable access for gestures, which work on the tree directly.
    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        &mut self.tree
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn commands(&self) -> &CommandStack<S> {
        &self.commands
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Swap in a tree loaded from the server. History, selection and
    /// clipboard are kept only where they still make sense.
    pub fn replace_tree(&mut self, tree: WidgetTree) {
        self.tree = tree;
        self.commands.clear();
        self.selection.retain_existing(&self.tree);
    }

    pub fn execute(&mut self, command: Option<Command>) -> Result<(), CoreError> {
        let result = self.commands.execute_command(&mut self.tree, command);
        self.selection.retain_existing(&self.tree);
        result
    }

    pub fn undo(&mut self) -> Result<bool, CoreError> {
        let result = self.commands.undo_command(&mut self.tree);
        self.selection.retain_existing(&self.tree);
        result
    }

    pub fn click(&mut self, id: &str, shift: bool) {
        self.selection.click(&self.tree, id, shift);
    }

    /// Capture the selection into the clipboard. Returns the number of
    /// top-level subtrees captured.
    pub fn copy(&mut self) -> Result<usize, CoreError> {
        if self.selection.is_empty() {
            return Ok(0);
        }
        let contents = Clipboard::capture(&self.tree, self.selection.ids())?;
        let count = contents.roots.len();
        self.clipboard.set(contents);
        Ok(count)
    }

    /// Copy the selection, then delete it as one undoable step.
    pub fn cut(&mut self) -> Result<usize, CoreError> {
        let count = self.copy()?;
        if count > 0 {
            self.delete_selected()?;
        }
        Ok(count)
    }

    pub fn delete_selected(&mut self) -> Result<(), CoreError> {
        if self.selection.is_empty() {
            return Ok(());
        }
        let command = DeleteCommand::new(self.selection.ids().to_vec());
        self.execute(Some(Command::reversible(command)))?;
        self.selection.clear();
        Ok(())
    }

    /// Paste the clipboard under `target_parent` with its top-left at
    /// `cursor`. Does nothing when the clipboard is empty.
    pub fn paste(&mut self, target_parent: &str, cursor: GridPoint) -> Result<(), CoreError> {
        let Some(contents) = self.clipboard.contents().cloned() else {
            return Ok(());
        };
        self.execute(Some(Command::reversible(PasteCommand::new(
            contents,
            target_parent,
            cursor,
        ))))
    }

    /// Drop a new widget from the palette. Returns its id.
    pub fn drop_new_widget(&mut self, mut widget: NewWidget) -> Result<String, CoreError> {
        let id = match &widget.id {
            Some(id) => id.clone(),
            None => self.tree.next_id(&widget.node_type),
        };
        widget.id = Some(id.clone());
        self.execute(Some(Command::reversible(DragCommand::from_palette(widget))))?;
        Ok(id)
    }

    pub fn start_drag(&mut self, id: &str) -> Result<DragGesture, CoreError> {
        DragGesture::start(&mut self.tree, id)
    }

    pub fn start_resize(&mut self, id: &str) -> Result<ResizeGesture, CoreError> {
        ResizeGesture::start(&mut self.tree, id, self.config.resize_throttle)
    }

    /// Edit one prop of `id`. Renames keep the selection pointing at the
    /// node.
    pub fn change_prop(
        &mut self,
        id: &str,
        key: &str,
        value: Value,
        reversible: bool,
    ) -> Result<(), CoreError> {
        let command = ChangePropCommand::new(id, key, value.clone());
        let command = if reversible {
            command.reversible()
        } else {
            command.one_shot()
        };
        let was_selected = self.selection.contains(id);
        self.execute(Some(command))?;

        if key == NAME_PROP && was_selected {
            if let Value::String(name) = value {
                let name = name.trim();
                if self.tree.contains(name) {
                    self.selection.click(&self.tree, name, false);
                }
            }
        }
        Ok(())
    }
}
