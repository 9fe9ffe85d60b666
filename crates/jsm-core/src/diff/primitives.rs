use super::EditOp;
use crate::{Node, Pointer};

/// Replaces scalars and values whose container kind changed.
pub(super) fn diff_primitives(rhs: &Node, path: &Pointer, out: &mut Vec<EditOp>) {
    out.push(EditOp::replace(path.clone(), rhs.clone()));
}
