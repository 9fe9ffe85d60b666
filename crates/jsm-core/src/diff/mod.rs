//! Structural edit scripts between two documents.
//!
//! Objects are compared member by member, arrays position by position and
//! anything else is replaced wholesale. The output follows RFC 6902: applying
//! the operations in order to the left-hand document yields the right-hand
//! one. Array identity is not considered here; grouping by anchor key happens
//! later when edits are assigned to conflict owners.

mod list;
mod object;
mod primitives;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::merge::apply;
use crate::{ApplyError, Node, Pointer};

/// Kind of a single edit operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    /// A member or array item appears.
    Add,
    /// A member or array item disappears.
    Remove,
    /// An existing value is swapped for another.
    Replace,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
            Self::Replace => f.write_str("replace"),
        }
    }
}

/// One RFC 6902 style operation.
///
/// ```
/// # use jsm_core::diff::{EditKind, EditOp};
/// # use jsm_core::{Node, Pointer};
/// let op = EditOp::add(Pointer::root().key("lang"), Node::from("en"));
/// assert_eq!(op.kind, EditKind::Add);
/// assert_eq!(serde_json::to_string(&op).unwrap(), r#"{"op":"add","path":"/lang","value":"en"}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditOp {
    /// What the operation does.
    #[serde(rename = "op")]
    pub kind: EditKind,
    /// Target location, in the coordinates of the document being edited.
    pub path: Pointer,
    /// New value for `add` and `replace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Node>,
}

impl EditOp {
    /// Creates an `add` operation.
    #[must_use]
    pub fn add(path: Pointer, value: Node) -> Self {
        Self { kind: EditKind::Add, path, value: Some(value) }
    }

    /// Creates a `remove` operation.
    #[must_use]
    pub fn remove(path: Pointer) -> Self {
        Self { kind: EditKind::Remove, path, value: None }
    }

    /// Creates a `replace` operation.
    #[must_use]
    pub fn replace(path: Pointer, value: Node) -> Self {
        Self { kind: EditKind::Replace, path, value: Some(value) }
    }
}

/// Ordered list of edit operations.
///
/// ```
/// # use jsm_core::{diff::diff_nodes, Node};
/// let lhs = Node::from_json_str("{\"a\":1,\"b\":[1,2]}")?;
/// let rhs = Node::from_json_str("{\"a\":2,\"b\":[1]}")?;
/// let script = diff_nodes(&lhs, &rhs);
/// assert_eq!(script.len(), 2);
/// assert_eq!(script.apply_to(&lhs)?, rhs);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript {
    ops: Vec<EditOp>,
}

impl EditScript {
    /// Constructs an empty script.
    #[must_use]
    pub fn empty() -> Self {
        Self { ops: Vec::new() }
    }

    /// Builds a script from the provided operations.
    #[must_use]
    pub fn from_ops(ops: Vec<EditOp>) -> Self {
        Self { ops }
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Indicates whether the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns an iterator over the operations.
    pub fn iter(&self) -> std::slice::Iter<'_, EditOp> {
        self.ops.iter()
    }

    /// Consumes the script and returns the operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<EditOp> {
        self.ops
    }

    /// Renders the script as an RFC 6902 JSON Patch document.
    ///
    /// ```
    /// # use jsm_core::{diff::diff_nodes, Node};
    /// let lhs = Node::from_json_str("[1,2,3]")?;
    /// let rhs = Node::from_json_str("[1,4]")?;
    /// let patch = diff_nodes(&lhs, &rhs).render_patch()?;
    /// assert_eq!(patch, r#"[{"op":"replace","path":"/1","value":4},{"op":"remove","path":"/2"}]"#);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn render_patch(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.ops)
    }

    /// Applies the operations in order to a copy of `target`.
    pub fn apply_to(&self, target: &Node) -> Result<Node, ApplyError> {
        let mut result = target.clone();
        for op in &self.ops {
            match (op.kind, &op.value) {
                (EditKind::Add, Some(value)) => {
                    apply::insert(&mut result, &op.path, value.clone())?;
                }
                (EditKind::Replace, Some(value)) => {
                    apply::set(&mut result, &op.path, value.clone())?;
                }
                (EditKind::Remove, _) => {
                    apply::remove(&mut result, &op.path)?;
                }
                (_, None) => {
                    return Err(ApplyError::Unresolved { path: op.path.to_string() });
                }
            }
        }
        Ok(result)
    }
}

impl IntoIterator for EditScript {
    type Item = EditOp;
    type IntoIter = std::vec::IntoIter<EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = std::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl From<Vec<EditOp>> for EditScript {
    fn from(value: Vec<EditOp>) -> Self {
        Self::from_ops(value)
    }
}

/// Computes the structural edit script turning `lhs` into `rhs`.
#[must_use]
pub fn diff_nodes(lhs: &Node, rhs: &Node) -> EditScript {
    let mut ops = Vec::new();
    diff_impl(lhs, rhs, &Pointer::root(), &mut ops);
    EditScript::from_ops(ops)
}

pub(super) fn diff_impl(lhs: &Node, rhs: &Node, path: &Pointer, out: &mut Vec<EditOp>) {
    if lhs == rhs {
        return;
    }

    match (lhs, rhs) {
        (Node::Object(left), Node::Object(right)) => object::diff_objects(left, right, path, out),
        (Node::Array(left), Node::Array(right)) => list::diff_lists(left, right, path, out),
        _ => primitives::diff_primitives(rhs, path, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::arb_json_value;
    use proptest::prelude::*;

    fn node(text: &str) -> Node {
        Node::from_json_str(text).unwrap()
    }

    fn pointer(text: &str) -> Pointer {
        text.parse().unwrap()
    }

    #[test]
    fn diff_of_numbers_produces_root_replacement() {
        let script = diff_nodes(&node("1"), &node("2"));
        assert_eq!(script, EditScript::from_ops(vec![EditOp::replace(Pointer::root(), node("2"))]));
    }

    #[test]
    fn diff_of_objects_tracks_additions_and_removals() {
        let script = diff_nodes(&node("{\"a\":1,\"b\":2}"), &node("{\"b\":2,\"c\":3}"));
        let expected = vec![EditOp::remove(pointer("/a")), EditOp::add(pointer("/c"), node("3"))];
        assert_eq!(script.into_ops(), expected);
    }

    #[test]
    fn nested_changes_keep_child_path() {
        let script = diff_nodes(
            &node("[{\"name\":\"jsm\",\"version\":1}]"),
            &node("[{\"name\":\"jsm\",\"version\":2}]"),
        );
        assert_eq!(script.into_ops(), vec![EditOp::replace(pointer("/0/version"), node("2"))]);
    }

    #[test]
    fn type_change_replaces_whole_value() {
        let script = diff_nodes(&node("{\"a\":[1]}"), &node("{\"a\":{\"0\":1}}"));
        assert_eq!(script.into_ops(), vec![EditOp::replace(pointer("/a"), node("{\"0\":1}"))]);
    }

    #[test]
    fn numeric_equality_ignores_representation() {
        assert!(diff_nodes(&node("[1.0]"), &node("[1]")).is_empty());
    }

    proptest! {
        #[test]
        fn identical_nodes_produce_empty_script(json in arb_json_value()) {
            let node = Node::from_json_value(json.clone()).unwrap();
            let other = Node::from_json_value(json).unwrap();
            prop_assert!(diff_nodes(&node, &other).is_empty());
        }

        #[test]
        fn script_transforms_lhs_into_rhs(a in arb_json_value(), b in arb_json_value()) {
            let lhs = Node::from_json_value(a).unwrap();
            let rhs = Node::from_json_value(b).unwrap();
            let script = diff_nodes(&lhs, &rhs);
            prop_assert_eq!(script.apply_to(&lhs).unwrap(), rhs);
        }
    }
}
