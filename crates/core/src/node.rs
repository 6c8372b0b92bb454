//! Widget node records and their serialized shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::grid::GridRect;
use crate::types::NodeId;

/// Props key that aliases the node id.
pub const NAME_PROP: &str = "name";

/// Open widget configuration map. Opaque to the editor apart from
/// [`NAME_PROP`].
pub type Props = Map<String, Value>;

/// One widget instance on a page, as held by [`crate::tree::WidgetTree`].
///
/// The root's `parent_id` equals its own `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub node_type: String,
    pub parent_id: NodeId,
    pub rect: GridRect,
    /// Hosts its own nested grid and auto-grows to fit its children.
    pub is_canvas: bool,
    pub column_width: Option<f64>,
    pub props: Props,
    /// Child ids in insertion order.
    pub nodes: Vec<NodeId>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.clone(),
            node_type: self.node_type.clone(),
            parent_id: self.parent_id.clone(),
            rect: self.rect,
            is_canvas: self.is_canvas,
            column_width: self.column_width,
            props: self.props.clone(),
        }
    }
}

/// Full node record as exchanged with the renderer and the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub parent_id: NodeId,
    #[serde(flatten)]
    pub rect: GridRect,
    #[serde(default)]
    pub is_canvas: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_width: Option<f64>,
    #[serde(default)]
    pub props: Props,
}

impl NodeSnapshot {
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }
}

/// A subset of node fields keyed by id. `name` carries a rename (new id).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialNodeUpdate {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_canvas: Option<bool>,
    /// Keys merged into the stored props.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Props>,
}

impl PartialNodeUpdate {
    /// An update carrying only a grid rectangle.
    pub fn rect(id: impl Into<NodeId>, rect: GridRect) -> Self {
        Self {
            id: id.into(),
            col: Some(rect.col),
            row: Some(rect.row),
            columns_count: Some(rect.columns_count),
            rows_count: Some(rect.rows_count),
            ..Default::default()
        }
    }

    /// An update carrying every field of `snapshot`.
    pub fn full(snapshot: &NodeSnapshot) -> Self {
        Self {
            parent_id: Some(snapshot.parent_id.clone()),
            is_canvas: Some(snapshot.is_canvas),
            props: Some(snapshot.props.clone()),
            ..Self::rect(snapshot.id.clone(), snapshot.rect)
        }
    }

    /// Apply the rectangle fields on top of `rect`.
    pub fn merge_rect(&self, rect: GridRect) -> GridRect {
        GridRect {
            col: self.col.unwrap_or(rect.col),
            row: self.row.unwrap_or(rect.row),
            columns_count: self.columns_count.unwrap_or(rect.columns_count),
            rows_count: self.rows_count.unwrap_or(rect.rows_count),
        }
    }

    pub fn has_rect(&self) -> bool {
        self.col.is_some()
            || self.row.is_some()
            || self.columns_count.is_some()
            || self.rows_count.is_some()
    }
}

/// Input for [`crate::tree::WidgetTree::add_widget`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewWidget {
    pub node_type: String,
    pub parent_id: NodeId,
    /// Generated from the type and a sequence counter when absent.
    pub id: Option<NodeId>,
    pub rect: GridRect,
    pub is_canvas: bool,
    pub props: Props,
}

impl NewWidget {
    pub fn new(node_type: impl Into<String>, parent_id: impl Into<NodeId>, rect: GridRect) -> Self {
        Self {
            node_type: node_type.into(),
            parent_id: parent_id.into(),
            id: None,
            rect,
            is_canvas: false,
            props: Props::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn canvas(mut self) -> Self {
        self.is_canvas = true;
        self
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_flat_camel_case() {
        let snap = NodeSnapshot {
            id: "button1".into(),
            node_type: "button".into(),
            parent_id: "canvas".into(),
            rect: GridRect::new(1, 2, 4, 2),
            is_canvas: false,
            column_width: None,
            props: Props::new(),
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["type"], "button");
        assert_eq!(json["parentId"], "canvas");
        assert_eq!(json["columnsCount"], 4);
        assert_eq!(json["rowsCount"], 2);
        assert!(json.get("columnWidth").is_none());

        let back: NodeSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn partial_update_omits_absent_fields() {
        let update = PartialNodeUpdate::rect("a", GridRect::new(0, 2, 4, 2));
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["row"], 2);
        assert!(json.get("parentId").is_none());
        assert!(json.get("props").is_none());
    }

    #[test]
    fn merge_rect_keeps_unset_fields() {
        let update = PartialNodeUpdate {
            id: "a".into(),
            row: Some(7),
            ..Default::default()
        };
        assert!(update.has_rect());
        assert_eq!(
            update.merge_rect(GridRect::new(1, 1, 3, 3)),
            GridRect::new(1, 7, 3, 3)
        );
    }
}
