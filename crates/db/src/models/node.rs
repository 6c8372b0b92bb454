//! Widget node rows and their translation to and from editor snapshots.
//!
//! Storage keeps the root's `parent_id` as `NULL`; snapshots use the root's
//! own id. [`parent_to_storage`] and [`parent_from_storage`] are the only
//! places that convert between the two.

use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use gridline_core::grid::GridRect;
use gridline_core::node::{NodeSnapshot, Props};
use gridline_core::types::{DbId, NodeId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `nodes` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NodeRow {
    pub page_id: DbId,
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub node_type: String,
    pub grid_col: i32,
    pub grid_row: i32,
    pub columns_count: i32,
    pub rows_count: i32,
    pub is_canvas: bool,
    pub column_width: Option<f64>,
    pub props: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A node row tagged with its distance from the page root.
#[derive(Debug, Clone, FromRow)]
pub struct TreeRow {
    #[sqlx(flatten)]
    pub node: NodeRow,
    pub depth: i32,
}

impl NodeRow {
    pub fn rect(&self) -> GridRect {
        GridRect::new(self.grid_col, self.grid_row, self.columns_count, self.rows_count)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Editor view of this row.
    pub fn into_snapshot(self) -> NodeSnapshot {
        let rect = self.rect();
        NodeSnapshot {
            parent_id: parent_from_storage(&self.id, self.parent_id),
            id: self.id,
            node_type: self.node_type,
            rect,
            is_canvas: self.is_canvas,
            column_width: self.column_width,
            props: props_from_value(self.props),
        }
    }
}

// ---------------------------------------------------------------------------
// Root sentinel translation
// ---------------------------------------------------------------------------

/// Storage form of a parent reference: a node naming itself as parent is
/// the root and is stored with no parent.
pub fn parent_to_storage<'a>(id: &str, parent_id: &'a str) -> Option<&'a str> {
    (parent_id != id).then_some(parent_id)
}

/// Editor form of a stored parent reference.
pub fn parent_from_storage(id: &str, parent_id: Option<NodeId>) -> NodeId {
    parent_id.unwrap_or_else(|| id.to_string())
}

/// Stored props are always a JSON object; anything else reads as empty.
pub fn props_from_value(value: Value) -> Props {
    match value {
        Value::Object(map) => map,
        _ => Props::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_parent_round_trip() {
        assert_eq!(parent_to_storage("canvas", "canvas"), None);
        assert_eq!(parent_to_storage("button1", "canvas"), Some("canvas"));
        assert_eq!(parent_from_storage("canvas", None), "canvas");
        assert_eq!(
            parent_from_storage("button1", Some("canvas".into())),
            "canvas"
        );
    }

    #[test]
    fn non_object_props_read_as_empty() {
        assert!(props_from_value(Value::Null).is_empty());
        assert!(props_from_value(serde_json::json!([1, 2])).is_empty());
        assert_eq!(
            props_from_value(serde_json::json!({"text": "Go"}))["text"],
            "Go"
        );
    }
}
