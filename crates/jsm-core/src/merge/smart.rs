//! Reconciliation of two differing object values.

use std::collections::BTreeMap;

use crate::schema::{validate, AdditionalProperties};
use crate::{Node, Pointer, Schema, SmartMergeError};

/// Merges `left` and `right` member by member.
///
/// Members present on one side only are kept when the schema admits them;
/// members present on both sides with different values are merged
/// recursively. Arrays and differing scalars never merge. Any refusal aborts
/// the whole attempt. Errors name locations below `path`.
pub(crate) fn smart_merge(
    left: &Node,
    right: &Node,
    schema: Option<&Schema>,
    path: &Pointer,
) -> Result<Node, SmartMergeError> {
    merge_at(left, right, schema, path)
}

fn merge_at(
    left: &Node,
    right: &Node,
    schema: Option<&Schema>,
    at: &Pointer,
) -> Result<Node, SmartMergeError> {
    if left == right {
        return Ok(left.clone());
    }
    match (left, right) {
        (Node::Object(lhs), Node::Object(rhs)) => {
            let mut merged = BTreeMap::new();
            for key in lhs.keys().chain(rhs.keys().filter(|key| !lhs.contains_key(*key))) {
                let path = at.key(key.as_str());
                let value = match (lhs.get(key), rhs.get(key)) {
                    (Some(a), Some(b)) => {
                        let child = schema.and_then(|schema| schema.property(key, Some(left)));
                        merge_at(a, b, child, &path)?
                    }
                    (Some(only), None) | (None, Some(only)) => {
                        admit(key, only, schema, left, &path)?;
                        only.clone()
                    }
                    (None, None) => continue,
                };
                merged.insert(key.clone(), value);
            }
            Ok(Node::Object(merged))
        }
        (Node::Array(_), _) | (_, Node::Array(_)) => {
            Err(SmartMergeError::Array { path: at.to_string() })
        }
        _ => Err(SmartMergeError::Scalar { path: at.to_string() }),
    }
}

/// Checks a member that only one side carries against the object's schema.
fn admit(
    key: &str,
    value: &Node,
    schema: Option<&Schema>,
    object: &Node,
    path: &Pointer,
) -> Result<(), SmartMergeError> {
    let Some(schema) = schema else {
        return Ok(());
    };
    if declares(schema, key, object) {
        return Ok(());
    }
    match schema.additional_properties(Some(object)) {
        AdditionalProperties::Allow => Ok(()),
        AdditionalProperties::Deny => {
            Err(SmartMergeError::AdditionalDenied { path: path.to_string() })
        }
        AdditionalProperties::Schema(extra) => {
            let violations = validate(value, extra);
            match violations.first() {
                None => Ok(()),
                Some(violation) => Err(SmartMergeError::AdditionalInvalid {
                    path: path.to_string(),
                    reason: violation.message.clone(),
                }),
            }
        }
    }
}

fn declares(schema: &Schema, key: &str, object: &Node) -> bool {
    if schema.body().property(key).is_some() {
        return true;
    }
    match schema {
        Schema::Fixed(_) => false,
        Schema::AllOf(union) => union.variants.iter().any(|branch| declares(branch, key, object)),
        Schema::OneOf(_) | Schema::AnyOf(_) => schema
            .select_variant(object)
            .is_some_and(|selected| declares(selected.schema, key, object)),
    }
}
