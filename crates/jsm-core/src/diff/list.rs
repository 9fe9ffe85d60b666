use super::{diff_impl, EditOp};
use crate::{Node, Pointer};

/// Positional array diff.
///
/// Shared positions are diffed recursively, surplus items on the right are
/// appended and surplus items on the left are removed from the back so that
/// every index stays valid while the script is applied in order.
pub(super) fn diff_lists(lhs: &[Node], rhs: &[Node], path: &Pointer, out: &mut Vec<EditOp>) {
    let shared = lhs.len().min(rhs.len());
    for (index, (left, right)) in lhs.iter().zip(rhs).enumerate() {
        diff_impl(left, right, &path.index(index), out);
    }

    for (index, item) in rhs.iter().enumerate().skip(shared) {
        out.push(EditOp::add(path.index(index), item.clone()));
    }

    for index in (shared..lhs.len()).rev() {
        out.push(EditOp::remove(path.index(index)));
    }
}

#[cfg(test)]
mod tests {
    use crate::diff::{diff_nodes, EditOp};
    use crate::Node;

    fn node(text: &str) -> Node {
        Node::from_json_str(text).unwrap()
    }

    #[test]
    fn append_adds_at_tail() {
        let ops = diff_nodes(&node("[1,2]"), &node("[1,2,3,4]")).into_ops();
        assert_eq!(
            ops,
            vec![
                EditOp::add("/2".parse().unwrap(), node("3")),
                EditOp::add("/3".parse().unwrap(), node("4")),
            ]
        );
    }

    #[test]
    fn truncation_removes_from_the_back() {
        let ops = diff_nodes(&node("[1,2,3]"), &node("[1]")).into_ops();
        assert_eq!(
            ops,
            vec![EditOp::remove("/2".parse().unwrap()), EditOp::remove("/1".parse().unwrap())]
        );
    }

    #[test]
    fn reordering_is_positional() {
        let ops = diff_nodes(&node("[\"a\",\"b\"]"), &node("[\"b\",\"a\"]")).into_ops();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.kind == crate::diff::EditKind::Replace));
    }
}
