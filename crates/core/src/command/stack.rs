//! Runs commands, forwards their payloads and keeps the undo history.

use crate::command::{Command, PayloadSink, Undoable};
use crate::error::CoreError;
use crate::tree::WidgetTree;
use crate::wire::WirePayload;

/// Per-session command runner.
///
/// There is no redo: an undone command is dropped.
pub struct CommandStack<S> {
    sink: S,
    undo: Vec<Box<dyn Undoable>>,
}

impl<S: PayloadSink> CommandStack<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            undo: Vec::new(),
        }
    }

    /// Run `command`, forward its payload and, if reversible, remember it.
    ///
    /// `None` is accepted and does nothing; gesture steps that only prepare
    /// state yield it. A reversible command that changed nothing (no
    /// payload) is not recorded.
    pub fn execute_command(
        &mut self,
        tree: &mut WidgetTree,
        command: Option<Command>,
    ) -> Result<(), CoreError> {
        let Some(command) = command else {
            return Ok(());
        };
        let name = command.name();
        match command {
            Command::Reversible(mut command) => {
                let payload = command.execute(tree)?;
                if payload.is_some() {
                    self.forward(payload);
                    self.undo.push(command);
                }
            }
            Command::OneShot(mut command) => {
                let payload = command.execute(tree)?;
                self.forward(payload);
            }
        }
        tracing::debug!(command = name, undo_depth = self.undo.len(), "Command executed");
        Ok(())
    }

    /// Undo the most recent reversible command. Returns `false` when the
    /// history is empty.
    ///
    /// A command whose undo fails stays on the stack.
    pub fn undo_command(&mut self, tree: &mut WidgetTree) -> Result<bool, CoreError> {
        let Some(mut command) = self.undo.pop() else {
            return Ok(false);
        };
        match command.undo(tree) {
            Ok(payload) => {
                tracing::debug!(command = command.name(), undo_depth = self.undo.len(), "Command undone");
                self.forward(payload);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(command = command.name(), error = %e, "Undo failed");
                self.undo.push(command);
                Err(e)
            }
        }
    }

    fn forward(&mut self, payload: Option<WirePayload>) {
        if let Some(payload) = payload {
            self.sink.send(payload);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Forget the history, e.g. after reloading the tree from the server.
    pub fn clear(&mut self) {
        self.undo.clear();
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
