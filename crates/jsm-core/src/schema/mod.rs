//! JSON Schema model used to guide comparison and merging.
//!
//! Only the draft-07 subset that influences conflict detection is modelled:
//! `type`, `properties`, `items`, `additionalProperties`, `required`,
//! `const`, `enum`, `format` and the `oneOf`/`anyOf`/`allOf` combinators.
//! Malformed keywords never fail a load below the root; they are dropped
//! with a `debug!` record and the affected sub-path simply gets no
//! guidance.

mod validate;
mod variant;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{Node, SchemaError, Segment};

pub use validate::{validate, Violation};
pub use variant::{resolve_variant, VariantMatch};

/// A schema node. Combinators are explicit cases rather than optional keys.
#[derive(Clone, Debug, PartialEq)]
pub enum Schema {
    /// A plain schema without combinators.
    Fixed(SchemaBody),
    /// Exactly one variant must match.
    OneOf(Union),
    /// At least one variant must match.
    AnyOf(Union),
    /// Every variant must match.
    AllOf(Union),
}

/// Variants of a combinator together with the keywords declared beside it.
#[derive(Clone, Debug, PartialEq)]
pub struct Union {
    /// Keywords declared next to the combinator (e.g. a shared `type`).
    pub shared: SchemaBody,
    /// Candidate schemas in declaration order.
    pub variants: Vec<Schema>,
}

/// JSON Schema primitive type names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonType {
    /// `null`
    Null,
    /// `boolean`
    Boolean,
    /// `integer`
    Integer,
    /// `number`
    Number,
    /// `string`
    String,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl JsonType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        })
    }

    /// Whether a value has this type at runtime.
    #[must_use]
    pub fn matches(self, value: &Node) -> bool {
        match (self, value) {
            (Self::Null, Node::Null)
            | (Self::Boolean, Node::Bool(_))
            | (Self::Number, Node::Number(_))
            | (Self::String, Node::String(_))
            | (Self::Array, Node::Array(_))
            | (Self::Object, Node::Object(_)) => true,
            (Self::Integer, Node::Number(n)) => n.is_integer(),
            _ => false,
        }
    }
}

/// Policy for object members not listed in `properties`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AdditionalProperties {
    /// `true` or absent.
    #[default]
    Allow,
    /// `false`.
    Deny,
    /// A schema every extra member must satisfy.
    Schema(Box<Schema>),
}

/// Keywords of a single schema object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaBody {
    /// Declared `type` (empty when unconstrained).
    pub types: Vec<JsonType>,
    /// `properties` in declaration order.
    pub properties: Vec<(String, Schema)>,
    /// `required` member names.
    pub required: Vec<String>,
    /// `items` schema for arrays.
    pub items: Option<Box<Schema>>,
    /// `additionalProperties` policy.
    pub additional: AdditionalProperties,
    /// `const` value.
    pub constant: Option<Node>,
    /// `enum` values.
    pub enumeration: Option<Vec<Node>>,
    /// `format` annotation.
    pub format: Option<String>,
    /// The boolean schema `false`.
    pub rejects_all: bool,
}

impl SchemaBody {
    /// The constant this body pins its value to: `const`, or a single-value `enum`.
    #[must_use]
    pub fn constant(&self) -> Option<&Node> {
        self.constant.as_ref().or_else(|| match self.enumeration.as_deref() {
            Some([only]) => Some(only),
            _ => None,
        })
    }

    /// Looks up a declared property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties.iter().find(|(key, _)| key == name).map(|(_, schema)| schema)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::Fixed(SchemaBody::default())
    }
}

impl Schema {
    /// Parses schema text.
    ///
    /// ```
    /// # use jsm_core::Schema;
    /// let schema = Schema::from_json_str(r#"{"type":"object","properties":{"id":{"type":"string"}}}"#)?;
    /// assert!(schema.body().property("id").is_some());
    /// assert!(Schema::from_json_str("42").is_err());
    /// # Ok::<(), jsm_core::SchemaError>(())
    /// ```
    pub fn from_json_str(input: &str) -> Result<Self, SchemaError> {
        let value: JsonValue = serde_json::from_str(input)?;
        Self::from_root(&value)
    }

    /// Parses a schema written as YAML.
    pub fn from_yaml_str(input: &str) -> Result<Self, SchemaError> {
        let value: JsonValue = serde_yaml::from_str(input)?;
        Self::from_root(&value)
    }

    /// Builds a schema from an already parsed root value.
    pub fn from_root(value: &JsonValue) -> Result<Self, SchemaError> {
        match value {
            JsonValue::Object(_) | JsonValue::Bool(_) => Ok(Self::from_value(value)),
            JsonValue::Null => Err(SchemaError::InvalidRoot { found: "null" }),
            JsonValue::Number(_) => Err(SchemaError::InvalidRoot { found: "number" }),
            JsonValue::String(_) => Err(SchemaError::InvalidRoot { found: "string" }),
            JsonValue::Array(_) => Err(SchemaError::InvalidRoot { found: "array" }),
        }
    }

    /// Builds a schema from any JSON value, degrading malformed parts to
    /// "no constraint".
    #[must_use]
    pub fn from_value(value: &JsonValue) -> Self {
        let map = match value {
            JsonValue::Object(map) => map,
            JsonValue::Bool(false) => {
                return Self::Fixed(SchemaBody { rejects_all: true, ..SchemaBody::default() });
            }
            JsonValue::Bool(true) => return Self::default(),
            other => {
                debug!(found = %other, "ignoring non-object schema node");
                return Self::default();
            }
        };

        let mut body = SchemaBody::default();
        match map.get("type") {
            Some(JsonValue::String(name)) => body.types.extend(JsonType::parse(name)),
            Some(JsonValue::Array(names)) => {
                let names = names.iter().filter_map(JsonValue::as_str);
                body.types.extend(names.filter_map(JsonType::parse));
            }
            Some(other) => debug!(found = %other, "ignoring malformed `type` keyword"),
            None => {}
        }
        match map.get("properties") {
            Some(JsonValue::Object(props)) => {
                body.properties = props
                    .iter()
                    .map(|(name, schema)| (name.clone(), Self::from_value(schema)))
                    .collect();
            }
            Some(other) => debug!(found = %other, "ignoring malformed `properties` keyword"),
            None => {}
        }
        if let Some(JsonValue::Array(names)) = map.get("required") {
            body.required =
                names.iter().filter_map(JsonValue::as_str).map(str::to_string).collect();
        }
        match map.get("items") {
            Some(items @ (JsonValue::Object(_) | JsonValue::Bool(_))) => {
                body.items = Some(Box::new(Self::from_value(items)));
            }
            Some(JsonValue::Array(tuple)) => {
                // Tuple validation carries no single item schema to match identities with.
                debug!(len = tuple.len(), "ignoring tuple-form `items`");
            }
            Some(other) => debug!(found = %other, "ignoring malformed `items` keyword"),
            None => {}
        }
        body.additional = match map.get("additionalProperties") {
            None | Some(JsonValue::Bool(true)) => AdditionalProperties::Allow,
            Some(JsonValue::Bool(false)) => AdditionalProperties::Deny,
            Some(schema @ JsonValue::Object(_)) => {
                AdditionalProperties::Schema(Box::new(Self::from_value(schema)))
            }
            Some(other) => {
                debug!(found = %other, "ignoring malformed `additionalProperties` keyword");
                AdditionalProperties::Allow
            }
        };
        if let Some(constant) = map.get("const") {
            body.constant = Node::from_json_value(constant.clone()).ok();
        }
        if let Some(JsonValue::Array(values)) = map.get("enum") {
            body.enumeration =
                Some(values.iter().filter_map(|v| Node::from_json_value(v.clone()).ok()).collect());
        }
        if let Some(JsonValue::String(format)) = map.get("format") {
            body.format = Some(format.clone());
        }

        let combinator = ["oneOf", "anyOf", "allOf"].into_iter().find_map(|keyword| {
            match map.get(keyword) {
                Some(JsonValue::Array(candidates)) => Some((keyword, candidates)),
                Some(other) => {
                    debug!(keyword, found = %other, "combinator is not an array");
                    None
                }
                None => None,
            }
        });
        if let Some((keyword, candidates)) = combinator {
            let union =
                Union { shared: body, variants: candidates.iter().map(Self::from_value).collect() };
            return match keyword {
                "oneOf" => Self::OneOf(union),
                "anyOf" => Self::AnyOf(union),
                _ => Self::AllOf(union),
            };
        }
        Self::Fixed(body)
    }

    /// Keywords of this node: the plain body, or the shared part of a union.
    #[must_use]
    pub fn body(&self) -> &SchemaBody {
        match self {
            Self::Fixed(body) => body,
            Self::OneOf(union) | Self::AnyOf(union) | Self::AllOf(union) => &union.shared,
        }
    }

    /// Candidate schemas when this node is a combinator.
    #[must_use]
    pub fn variants(&self) -> Option<&[Schema]> {
        match self {
            Self::Fixed(_) => None,
            Self::OneOf(union) | Self::AnyOf(union) | Self::AllOf(union) => Some(&union.variants),
        }
    }

    /// Whether this node is a `oneOf`/`anyOf`/`allOf` combinator.
    #[must_use]
    pub fn is_union(&self) -> bool {
        self.variants().is_some_and(|variants| !variants.is_empty())
    }

    /// Picks the variant describing `value`, if this node is a combinator.
    #[must_use]
    pub fn select_variant(&self, value: &Node) -> Option<VariantMatch<'_>> {
        resolve_variant(value, self.variants()?)
    }

    /// The schema for the member `name` of an object value.
    ///
    /// Combinators are resolved against `value` first; `allOf` consults every
    /// branch. Returns `None` when the schema gives no guidance.
    #[must_use]
    pub fn property(&self, name: &str, value: Option<&Node>) -> Option<&Schema> {
        let found = self.branch_lookup(value, |branch, inner| branch.property(name, inner));
        if let Some(found) = found {
            return Some(found);
        }
        let body = self.body();
        body.property(name).or(match &body.additional {
            AdditionalProperties::Schema(schema) => Some(schema.as_ref()),
            _ => None,
        })
    }

    /// The item schema of an array value.
    #[must_use]
    pub fn items(&self, value: Option<&Node>) -> Option<&Schema> {
        if let Some(found) = self.branch_lookup(value, |branch, inner| branch.items(inner)) {
            return Some(found);
        }
        self.body().items.as_deref()
    }

    /// Navigates one segment down, given the value the segment is applied to.
    #[must_use]
    pub fn child(&self, segment: &Segment, value: Option<&Node>) -> Option<&Schema> {
        match (segment, value) {
            (_, Some(Node::Array(_))) | (Segment::Index(_), None) => self.items(value),
            _ => self.property(&segment.token(), value),
        }
    }

    /// The effective `additionalProperties` policy for an object value.
    #[must_use]
    pub fn additional_properties(&self, value: Option<&Node>) -> &AdditionalProperties {
        let restricted =
            |policy: &AdditionalProperties| !matches!(policy, AdditionalProperties::Allow);
        match self {
            Self::Fixed(_) => {}
            Self::AllOf(union) => {
                let found = union
                    .variants
                    .iter()
                    .map(|branch| branch.additional_properties(value))
                    .find(|policy| restricted(policy));
                if let Some(policy) = found {
                    return policy;
                }
            }
            Self::OneOf(_) | Self::AnyOf(_) => {
                if let Some(selected) = value.and_then(|v| self.select_variant(v)) {
                    let policy = selected.schema.additional_properties(value);
                    if restricted(policy) {
                        return policy;
                    }
                }
            }
        }
        &self.body().additional
    }

    /// Properties pinned to a constant, in declaration order.
    #[must_use]
    pub fn const_properties(&self) -> Vec<(&str, &Node)> {
        self.body()
            .properties
            .iter()
            .filter_map(|(name, schema)| schema.body().constant().map(|c| (name.as_str(), c)))
            .collect()
    }

    fn branch_lookup<'s, F>(&'s self, value: Option<&Node>, lookup: F) -> Option<&'s Schema>
    where
        F: Fn(&'s Schema, Option<&Node>) -> Option<&'s Schema>,
    {
        match self {
            Self::Fixed(_) => None,
            Self::AllOf(union) => union.variants.iter().find_map(|branch| lookup(branch, value)),
            Self::OneOf(_) | Self::AnyOf(_) => {
                let selected = value.and_then(|v| self.select_variant(v))?;
                lookup(selected.schema, value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(text: &str) -> Schema {
        Schema::from_json_str(text).unwrap()
    }

    #[test]
    fn parses_combinator_with_shared_keywords() {
        let schema = schema(
            r#"{"type":"object","oneOf":[{"properties":{"a":{"const":1}}},{"properties":{"b":{}}}]}"#,
        );
        assert!(schema.is_union());
        assert_eq!(schema.body().types, vec![JsonType::Object]);
        assert_eq!(schema.variants().unwrap().len(), 2);
    }

    #[test]
    fn malformed_keywords_degrade_to_no_guidance() {
        let schema = schema(r#"{"properties":[1,2],"oneOf":{"not":"an array"},"items":7}"#);
        assert!(!schema.is_union());
        assert!(schema.body().properties.is_empty());
        assert!(schema.items(None).is_none());
    }

    #[test]
    fn properties_keep_declaration_order() {
        let schema = schema(r#"{"properties":{"zeta":{"const":"z"},"alpha":{"const":"a"}}}"#);
        let names: Vec<_> = schema.const_properties().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn property_lookup_follows_selected_variant() {
        let schema = schema(
            r#"{"oneOf":[
                {"properties":{"kind":{"const":"a"},"x":{"type":"string"}}},
                {"properties":{"kind":{"const":"b"},"x":{"type":"number"}}}
            ]}"#,
        );
        let value = Node::from_json_str(r#"{"kind":"b","x":1}"#).unwrap();
        let x = schema.property("x", Some(&value)).unwrap();
        assert_eq!(x.body().types, vec![JsonType::Number]);
    }

    #[test]
    fn all_of_merges_branch_properties() {
        let schema = schema(
            r#"{"allOf":[{"properties":{"a":{"type":"string"}}},{"properties":{"b":{"type":"array","items":{"type":"number"}}}}]}"#,
        );
        assert!(schema.property("a", None).is_some());
        let b = schema.property("b", None).unwrap();
        assert!(b.items(None).is_some());
    }

    #[test]
    fn additional_properties_policy() {
        let closed = schema(r#"{"additionalProperties":false}"#);
        assert_eq!(closed.additional_properties(None), &AdditionalProperties::Deny);
        let open = schema("{}");
        assert_eq!(open.additional_properties(None), &AdditionalProperties::Allow);
        let typed = schema(r#"{"additionalProperties":{"type":"string"}}"#);
        assert!(typed.property("anything", None).is_some());
    }

    #[test]
    fn single_value_enum_acts_as_constant() {
        let schema = schema(r#"{"properties":{"t":{"enum":["card"]},"u":{"enum":["a","b"]}}}"#);
        let consts = schema.const_properties();
        assert_eq!(consts.len(), 1);
        assert_eq!(consts[0].0, "t");
    }

    #[test]
    fn yaml_schema_loads() {
        let schema = Schema::from_yaml_str("type: array\nitems:\n  type: object\n").unwrap();
        assert!(schema.items(None).is_some());
    }

    #[test]
    fn invalid_roots_are_rejected() {
        assert!(matches!(
            Schema::from_json_str("[]"),
            Err(SchemaError::InvalidRoot { found: "array" })
        ));
    }
}
