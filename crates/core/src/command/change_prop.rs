//! Property edits from the inspector.
//!
//! Edits are one-shot unless built with [`ChangePropCommand::reversible`].
//! Setting the `name` prop renames the node.

use serde_json::Value;

use crate::command::{Command, CommandResult, Execute, Undoable};
use crate::error::CoreError;
use crate::node::{PartialNodeUpdate, Props, NAME_PROP};
use crate::tree::WidgetTree;
use crate::types::NodeId;
use crate::wire::WirePayload;

#[derive(Debug)]
enum Previous {
    Renamed { from: NodeId, to: NodeId },
    Value(Option<Value>),
}

#[derive(Debug)]
pub struct ChangePropCommand {
    id: NodeId,
    key: String,
    value: Value,
    previous: Option<Previous>,
}

impl ChangePropCommand {
    pub fn new(id: impl Into<NodeId>, key: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value,
            previous: None,
        }
    }

    /// Wrap as a command that lands on the undo stack.
    pub fn reversible(self) -> Command {
        Command::reversible(self)
    }

    /// Wrap as a plain, non-undoable edit.
    pub fn one_shot(self) -> Command {
        Command::one_shot(self)
    }

    pub fn is_rename(&self) -> bool {
        self.key == NAME_PROP
    }

    /// The node id after the edit ran.
    pub fn current_id(&self) -> &str {
        match &self.previous {
            Some(Previous::Renamed { to, .. }) => to,
            _ => &self.id,
        }
    }

    fn rename(tree: &mut WidgetTree, from: &str, to: &str) -> CommandResult {
        tree.rename(from, to)?;
        tree.set_prop(to, NAME_PROP, Value::String(to.to_string()))?;
        let mut props = Props::new();
        props.insert(NAME_PROP.to_string(), Value::String(to.to_string()));
        Ok(Some(WirePayload::Update(vec![PartialNodeUpdate {
            id: from.to_string(),
            name: Some(to.to_string()),
            props: Some(props),
            ..Default::default()
        }])))
    }

    fn prop_update(id: &str, key: &str, value: Value) -> WirePayload {
        let mut props = Props::new();
        props.insert(key.to_string(), value);
        WirePayload::Update(vec![PartialNodeUpdate {
            id: id.to_string(),
            props: Some(props),
            ..Default::default()
        }])
    }
}

impl Execute for ChangePropCommand {
    fn name(&self) -> &'static str {
        if self.is_rename() {
            "rename"
        } else {
            "change_prop"
        }
    }

    fn execute(&mut self, tree: &mut WidgetTree) -> CommandResult {
        tree.node(&self.id)?;
        if self.is_rename() {
            let to = match &self.value {
                Value::String(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => {
                    return Err(CoreError::Validation(
                        "Widget name must be a non-empty string".into(),
                    ))
                }
            };
            if to == self.id {
                return Ok(None);
            }
            let payload = Self::rename(tree, &self.id, &to)?;
            tracing::debug!(from = %self.id, to = %to, "Widget renamed");
            self.previous = Some(Previous::Renamed {
                from: self.id.clone(),
                to,
            });
            return Ok(payload);
        }

        let old = tree.set_prop(&self.id, &self.key, self.value.clone())?;
        if old.as_ref() == Some(&self.value) {
            return Ok(None);
        }
        self.previous = Some(Previous::Value(old));
        Ok(Some(Self::prop_update(&self.id, &self.key, self.value.clone())))
    }
}

impl Undoable for ChangePropCommand {
    /// A prop that did not exist before is removed again; the server is told
    /// with a `null` value.
    fn undo(&mut self, tree: &mut WidgetTree) -> CommandResult {
        match self.previous.take() {
            None => Ok(None),
            Some(Previous::Renamed { from, to }) => match Self::rename(tree, &to, &from) {
                Ok(payload) => Ok(payload),
                Err(e) => {
                    self.previous = Some(Previous::Renamed { from, to });
                    Err(e)
                }
            },
            Some(Previous::Value(old)) => {
                tree.node(&self.id)?;
                let sent = match old {
                    Some(value) => {
                        tree.set_prop(&self.id, &self.key, value.clone())?;
                        value
                    }
                    None => {
                        tree.remove_prop(&self.id, &self.key)?;
                        Value::Null
                    }
                };
                Ok(Some(Self::prop_update(&self.id, &self.key, sent)))
            }
        }
    }
}
