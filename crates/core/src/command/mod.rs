//! Atomic, optionally reversible tree mutations.
//!
//! A command runs against a [`WidgetTree`] and reports what it changed as a
//! [`WirePayload`]. Whether a command can be undone is fixed when it is
//! built: [`Command::Reversible`] commands land on the undo stack,
//! [`Command::OneShot`] commands do not.

pub mod change_prop;
pub mod delete;
pub mod drag;
pub mod paste;
pub mod resize;
pub mod stack;

use std::fmt;

use crate::error::CoreError;
use crate::node::PartialNodeUpdate;
use crate::tree::{Displacement, WidgetTree};
use crate::wire::WirePayload;

pub use change_prop::ChangePropCommand;
pub use delete::DeleteCommand;
pub use drag::{DragCommand, DragGesture};
pub use paste::PasteCommand;
pub use resize::{ResizeCommand, ResizeGesture};
pub use stack::CommandStack;

/// Outcome of running or undoing a command.
pub type CommandResult = Result<Option<WirePayload>, CoreError>;

/// A tree mutation.
///
/// Implementations validate everything they can before touching the tree,
/// so an `Err` leaves the tree as it was.
pub trait Execute: fmt::Debug {
    fn name(&self) -> &'static str;

    fn execute(&mut self, tree: &mut WidgetTree) -> CommandResult;
}

/// A tree mutation that can be reversed after it ran.
pub trait Undoable: Execute {
    fn undo(&mut self, tree: &mut WidgetTree) -> CommandResult;
}

/// A command tagged with its undo capability.
#[derive(Debug)]
pub enum Command {
    Reversible(Box<dyn Undoable>),
    OneShot(Box<dyn Execute>),
}

impl Command {
    pub fn reversible(command: impl Undoable + 'static) -> Self {
        Command::Reversible(Box::new(command))
    }

    pub fn one_shot(command: impl Execute + 'static) -> Self {
        Command::OneShot(Box::new(command))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Reversible(c) => c.name(),
            Command::OneShot(c) => c.name(),
        }
    }

    pub fn is_reversible(&self) -> bool {
        matches!(self, Command::Reversible(_))
    }
}

/// Destination for payloads produced by commands, normally the sync channel.
pub trait PayloadSink {
    fn send(&mut self, payload: WirePayload);
}

/// Collects payloads in memory.
impl PayloadSink for Vec<WirePayload> {
    fn send(&mut self, payload: WirePayload) {
        self.push(payload);
    }
}

impl<S: PayloadSink + ?Sized> PayloadSink for &mut S {
    fn send(&mut self, payload: WirePayload) {
        (**self).send(payload);
    }
}

/// Current rectangles of every displaced node except those in `skip`, as
/// side-effect updates.
pub(crate) fn displaced_updates(
    tree: &WidgetTree,
    displaced: &Displacement,
    skip: &[&str],
) -> Vec<PartialNodeUpdate> {
    displaced
        .keys()
        .filter(|id| !skip.contains(&id.as_str()))
        .filter_map(|id| tree.get(id))
        .map(|node| PartialNodeUpdate::rect(node.id.clone(), node.rect))
        .collect()
}
