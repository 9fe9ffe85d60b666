use std::fmt;

use serde::Serialize;

use crate::compare::deep_equal;
use crate::{Node, Pointer};

use super::{AdditionalProperties, Schema, SchemaBody};

/// A place where a value does not satisfy its schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Violation {
    /// Location of the offending value.
    pub pointer: Pointer,
    /// Human readable description.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pointer.is_empty() {
            write!(f, "at document root: {}", self.message)
        } else {
            write!(f, "at {}: {}", self.pointer, self.message)
        }
    }
}

/// Checks `value` against the supported keyword subset.
///
/// ```
/// # use jsm_core::{schema::validate, Node, Schema};
/// let schema = Schema::from_json_str(r#"{"type":"object","required":["id"],"additionalProperties":false,"properties":{"id":{"type":"integer"}}}"#)?;
/// assert!(validate(&Node::from_json_str(r#"{"id":1}"#)?, &schema).is_empty());
/// let bad = validate(&Node::from_json_str(r#"{"id":1.5,"x":0}"#)?, &schema);
/// assert_eq!(bad.len(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn validate(value: &Node, schema: &Schema) -> Vec<Violation> {
    let mut violations = Vec::new();
    check(value, schema, &Pointer::root(), &mut violations);
    violations
}

fn check(value: &Node, schema: &Schema, at: &Pointer, out: &mut Vec<Violation>) {
    check_body(value, schema.body(), at, out);
    match schema {
        Schema::Fixed(_) => {}
        Schema::AllOf(union) => {
            for branch in &union.variants {
                check(value, branch, at, out);
            }
        }
        Schema::OneOf(union) | Schema::AnyOf(union) => {
            if union.variants.is_empty() {
                return;
            }
            let matching =
                union.variants.iter().filter(|branch| validate_at(value, branch, at)).count();
            let ok = match schema {
                Schema::OneOf(_) => matching == 1,
                _ => matching >= 1,
            };
            if !ok {
                out.push(Violation {
                    pointer: at.clone(),
                    message: format!(
                        "value matches {matching} of {} candidate schemas",
                        union.variants.len()
                    ),
                });
            }
        }
    }
}

fn validate_at(value: &Node, schema: &Schema, at: &Pointer) -> bool {
    let mut scratch = Vec::new();
    check(value, schema, at, &mut scratch);
    scratch.is_empty()
}

fn check_body(value: &Node, body: &SchemaBody, at: &Pointer, out: &mut Vec<Violation>) {
    let mut fail = |message: String| out.push(Violation { pointer: at.clone(), message });

    if body.rejects_all {
        fail("no value is allowed here".to_string());
        return;
    }
    if !body.types.is_empty() && !body.types.iter().any(|t| t.matches(value)) {
        fail(format!("unexpected {}", value.type_name()));
        return;
    }
    if let Some(constant) = &body.constant {
        if !deep_equal(constant, value) {
            fail(format!("expected constant {}", constant.to_compact_string()));
        }
    }
    if let Some(allowed) = &body.enumeration {
        if !allowed.iter().any(|candidate| deep_equal(candidate, value)) {
            fail(format!("{} is not one of the enumerated values", value.to_compact_string()));
        }
    }

    match value {
        Node::Object(members) => {
            for name in &body.required {
                if !members.contains_key(name) {
                    fail(format!("missing required property `{name}`"));
                }
            }
            for (name, member) in members {
                let child = at.key(name.as_str());
                match body.property(name) {
                    Some(schema) => check(member, schema, &child, out),
                    None => match &body.additional {
                        AdditionalProperties::Allow => {}
                        AdditionalProperties::Deny => out.push(Violation {
                            pointer: child,
                            message: "additional property is not allowed".to_string(),
                        }),
                        AdditionalProperties::Schema(schema) => check(member, schema, &child, out),
                    },
                }
            }
        }
        Node::Array(items) => {
            if let Some(schema) = &body.items {
                for (index, item) in items.iter().enumerate() {
                    check(item, schema, &at.index(index), out);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(text: &str) -> Schema {
        Schema::from_json_str(text).unwrap()
    }

    fn node(text: &str) -> Node {
        Node::from_json_str(text).unwrap()
    }

    #[test]
    fn reports_nested_pointer() {
        let schema =
            schema(r#"{"properties":{"items":{"items":{"properties":{"n":{"type":"number"}}}}}}"#);
        let violations = validate(&node(r#"{"items":[{"n":1},{"n":"x"}]}"#), &schema);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].pointer.to_string(), "/items/1/n");
    }

    #[test]
    fn one_of_requires_exactly_one_match() {
        let schema = schema(r#"{"oneOf":[{"type":"number"},{"type":"integer"}]}"#);
        assert!(validate(&node("1.5"), &schema).is_empty());
        assert_eq!(validate(&node("2"), &schema).len(), 1);
        assert_eq!(validate(&node("\"s\""), &schema).len(), 1);
    }

    #[test]
    fn false_schema_rejects_everything() {
        let schema = schema(r#"{"properties":{"locked":false}}"#);
        let violations = validate(&node(r#"{"locked":null}"#), &schema);
        assert_eq!(violations[0].to_string(), "at /locked: no value is allowed here");
    }
}
