use std::collections::BTreeMap;

use super::{diff_impl, EditOp};
use crate::{Node, Pointer};

pub(super) fn diff_objects(
    lhs: &BTreeMap<String, Node>,
    rhs: &BTreeMap<String, Node>,
    path: &Pointer,
    out: &mut Vec<EditOp>,
) {
    for (key, value) in lhs {
        let sub_path = path.key(key.as_str());
        match rhs.get(key) {
            Some(other) => diff_impl(value, other, &sub_path, out),
            None => out.push(EditOp::remove(sub_path)),
        }
    }

    for (key, value) in rhs {
        if lhs.contains_key(key) {
            continue;
        }
        out.push(EditOp::add(path.key(key.as_str()), value.clone()));
    }
}
