//! Deep structural equality over parsed documents.
//!
//! Objects compare by key set and member values (order irrelevant), arrays
//! element-wise (order relevant), scalars by type and value. An absent value
//! is only equal to another absent value.

use crate::{Node, Pointer};

/// Deep equality between two nodes.
///
/// ```
/// # use jsm_core::{compare::deep_equal, Node};
/// let a = Node::from_json_str("{\"x\":[1,2],\"y\":null}")?;
/// let b = Node::from_json_str("{\"y\":null,\"x\":[1,2]}")?;
/// let c = Node::from_json_str("{\"y\":null,\"x\":[2,1]}")?;
/// assert!(deep_equal(&a, &b));
/// assert!(!deep_equal(&a, &c));
/// # Ok::<(), jsm_core::CanonicalizeError>(())
/// ```
#[must_use]
pub fn deep_equal(lhs: &Node, rhs: &Node) -> bool {
    match (lhs, rhs) {
        (Node::Null, Node::Null) => true,
        (Node::Bool(a), Node::Bool(b)) => a == b,
        (Node::Number(a), Node::Number(b)) => a == b,
        (Node::String(a), Node::String(b)) => a == b,
        (Node::Array(a), Node::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Node::Object(a), Node::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key).is_some_and(|other| deep_equal(value, other))
                })
        }
        _ => false,
    }
}

/// Deep equality where either side may be absent.
#[must_use]
pub fn optional_equal(lhs: Option<&Node>, rhs: Option<&Node>) -> bool {
    match (lhs, rhs) {
        (None, None) => true,
        (Some(a), Some(b)) => deep_equal(a, b),
        _ => false,
    }
}

/// Whether the value at `pointer` differs between two documents.
///
/// A missing document behaves like a document where nothing resolves.
#[must_use]
pub fn differs_at(lhs: Option<&Node>, rhs: Option<&Node>, pointer: &Pointer) -> bool {
    let left = lhs.and_then(|doc| doc.get(pointer));
    let right = rhs.and_then(|doc| doc.get(pointer));
    !optional_equal(left, right)
}
