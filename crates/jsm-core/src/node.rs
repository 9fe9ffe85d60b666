use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::{CanonicalizeError, Number, Pointer, Segment};

/// Parsed JSON document value.
///
/// Objects keep their members in a `BTreeMap`, so key order never influences
/// equality or the serialized form of a merge result.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number, integers kept exact.
    Number(Number),
    /// JSON string.
    String(String),
    /// JSON array.
    Array(Vec<Node>),
    /// JSON object with deterministic key ordering.
    Object(BTreeMap<String, Node>),
}

impl Node {
    /// Parses a JSON string into a node.
    ///
    /// ```
    /// # use jsm_core::Node;
    /// let node = Node::from_json_str("{\"hello\":\"world\"}")?;
    /// assert!(matches!(node, Node::Object(_)));
    /// assert!(Node::from_json_str("  ").is_err());
    /// # Ok::<(), jsm_core::CanonicalizeError>(())
    /// ```
    pub fn from_json_str(input: &str) -> Result<Self, CanonicalizeError> {
        if input.trim().is_empty() {
            return Err(CanonicalizeError::Empty);
        }
        let value: JsonValue = serde_json::from_str(input)?;
        Self::from_json_value(value)
    }

    /// Parses a YAML string into a node.
    ///
    /// ```
    /// # use jsm_core::Node;
    /// let node = Node::from_yaml_str("---\nanswer: 42\n")?;
    /// assert_eq!(node.get(&"/answer".parse().unwrap()), Some(&Node::from_json_str("42")?));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_yaml_str(input: &str) -> Result<Self, CanonicalizeError> {
        if input.trim().is_empty() {
            return Err(CanonicalizeError::Empty);
        }
        let value: YamlValue = serde_yaml::from_str(input)?;
        Self::from_yaml_value(value)
    }

    /// Converts a serde JSON value into a [`Node`].
    pub fn from_json_value(value: JsonValue) -> Result<Self, CanonicalizeError> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(v) => Ok(Self::Bool(v)),
            JsonValue::Number(num) => Number::from_json_number(&num).map(Self::Number),
            JsonValue::String(s) => Ok(Self::String(s)),
            JsonValue::Array(values) => values
                .into_iter()
                .map(Self::from_json_value)
                .collect::<Result<_, _>>()
                .map(Self::Array),
            JsonValue::Object(map) => {
                let mut object = BTreeMap::new();
                for (key, value) in map {
                    object.insert(key, Self::from_json_value(value)?);
                }
                Ok(Self::Object(object))
            }
        }
    }

    fn from_yaml_value(value: YamlValue) -> Result<Self, CanonicalizeError> {
        match value {
            YamlValue::Null => Ok(Self::Null),
            YamlValue::Bool(v) => Ok(Self::Bool(v)),
            YamlValue::Number(num) => {
                if let Some(value) = num.as_u64() {
                    return Ok(Self::Number(Number::from(value)));
                }
                if let Some(value) = num.as_i64() {
                    return Ok(Self::Number(Number::from(value)));
                }
                match num.as_f64() {
                    Some(value) => Number::new(value).map(Self::Number),
                    None => Err(CanonicalizeError::NumberOutOfRange { value: num.to_string() }),
                }
            }
            YamlValue::String(s) => Ok(Self::String(s)),
            YamlValue::Sequence(seq) => seq
                .into_iter()
                .map(Self::from_yaml_value)
                .collect::<Result<_, _>>()
                .map(Self::Array),
            YamlValue::Mapping(map) => {
                let mut object = BTreeMap::new();
                for (key, value) in map {
                    let YamlValue::String(key) = key else {
                        return Err(CanonicalizeError::NonStringYamlKey {
                            found: format!("{key:?}"),
                        });
                    };
                    object.insert(key, Self::from_yaml_value(value)?);
                }
                Ok(Self::Object(object))
            }
            YamlValue::Tagged(tagged) => {
                Err(CanonicalizeError::UnsupportedYamlTag { tag: tagged.tag.to_string() })
            }
        }
    }

    /// Converts the node into a serde JSON value.
    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(v) => JsonValue::Bool(*v),
            Self::Number(n) => JsonValue::Number(n.to_json_number()),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(values) => {
                JsonValue::Array(values.iter().map(Self::to_json_value).collect())
            }
            Self::Object(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map {
                    object.insert(key.clone(), value.to_json_value());
                }
                JsonValue::Object(object)
            }
        }
    }

    /// Compact single-line JSON text.
    #[must_use]
    pub fn to_compact_string(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Two-space indented JSON text, the layout line ranges are computed on.
    #[must_use]
    pub fn to_pretty_string(&self) -> String {
        // Serializing a Value into a String buffer has no failure mode.
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_default()
    }

    /// The JSON Schema type name of this value.
    ///
    /// ```
    /// # use jsm_core::Node;
    /// assert_eq!(Node::from_json_str("[1]").unwrap().type_name(), "array");
    /// assert_eq!(Node::Null.type_name(), "null");
    /// ```
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Returns the object members when this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the array items when this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Resolves a single segment against this node.
    #[must_use]
    pub fn child(&self, segment: &Segment) -> Option<&Node> {
        match self {
            Self::Object(map) => map.get(&segment.token()),
            Self::Array(items) => segment.as_index().and_then(|index| items.get(index)),
            _ => None,
        }
    }

    /// Structural lookup of a pointer.
    ///
    /// ```
    /// # use jsm_core::Node;
    /// let doc = Node::from_json_str("{\"a\":[{\"b\":true}]}")?;
    /// let found = doc.get(&"/a/0/b".parse().unwrap());
    /// assert_eq!(found, Some(&Node::Bool(true)));
    /// assert!(doc.get(&"/a/1".parse().unwrap()).is_none());
    /// # Ok::<(), jsm_core::CanonicalizeError>(())
    /// ```
    #[must_use]
    pub fn get(&self, pointer: &Pointer) -> Option<&Node> {
        self.get_segments(pointer.segments())
    }

    /// Structural lookup of a relative path expressed as segments.
    #[must_use]
    pub fn get_segments(&self, segments: &[Segment]) -> Option<&Node> {
        segments.iter().try_fold(self, |node, segment| node.child(segment))
    }
}

impl TryFrom<JsonValue> for Node {
    type Error = CanonicalizeError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_json_value(value)
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        Self::from_json_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::{
        collection::{btree_map, vec},
        prelude::*,
        string::string_regex,
    };

    pub(crate) fn arb_json_value() -> impl Strategy<Value = JsonValue> {
        let leaf = prop_oneof![
            Just(JsonValue::Null),
            any::<bool>().prop_map(JsonValue::Bool),
            (-1000i64..1000).prop_map(|n| JsonValue::Number(n.into())),
            string_regex("[a-zA-Z0-9]{0,8}").unwrap().prop_map(JsonValue::String),
        ];
        leaf.prop_recursive(4, 8, 4, move |inner| {
            prop_oneof![
                vec(inner.clone(), 0..4).prop_map(JsonValue::Array),
                btree_map(string_regex("[a-zA-Z0-9]{1,8}").unwrap(), inner, 0..4).prop_map(|map| {
                    JsonValue::Object(map.into_iter().collect())
                }),
            ]
        })
    }

    #[test]
    fn whitespace_is_rejected_as_empty() {
        let err = Node::from_json_str("   \n\t").unwrap_err();
        assert!(matches!(err, CanonicalizeError::Empty));
    }

    #[test]
    fn json_object_roundtrip() {
        let node = Node::from_json_str("{\"a\":1,\"b\":true}").unwrap();
        let value = node.to_json_value();
        assert_eq!(value, serde_json::json!({"a": 1, "b": true}));
    }

    #[test]
    fn key_order_does_not_matter() {
        let lhs = Node::from_json_str("{\"a\":1,\"b\":2}").unwrap();
        let rhs = Node::from_json_str("{\"b\":2,\"a\":1}").unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn json_number_out_of_range_yields_error() {
        let err = Node::from_json_str("1e400").unwrap_err();
        match err {
            CanonicalizeError::NumberOutOfRange { .. } | CanonicalizeError::Json(_) => {}
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn yaml_non_string_key_errors() {
        let err = Node::from_yaml_str("? [1, 2]: 3").unwrap_err();
        let CanonicalizeError::NonStringYamlKey { .. } = err else {
            panic!("expected NonStringYamlKey error");
        };
    }

    #[test]
    fn object_lookup_accepts_numeric_looking_keys() {
        let doc = Node::from_json_str("{\"0\":{\"1\":\"x\"}}").unwrap();
        assert_eq!(doc.get(&"/0/1".parse().unwrap()), Some(&Node::from("x")));
    }

    #[test]
    fn serde_form_is_plain_json() {
        let node = Node::from_json_str("{\"a\":[1,null,\"s\"]}").unwrap();
        let text = serde_json::to_string(&node).unwrap();
        assert_eq!(text, "{\"a\":[1,null,\"s\"]}");
        let back: Node = serde_json::from_str(&text).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn large_integers_survive_a_roundtrip() {
        let text = r#"{"m":-9007199254740993,"n":12345678901234567891}"#;
        let node =
            Node::from_json_str(r#"{"n":12345678901234567891,"m":-9007199254740993}"#).unwrap();
        assert_eq!(node.to_compact_string(), text);
        let yaml = Node::from_yaml_str("n: 12345678901234567891\n").unwrap();
        assert_eq!(yaml, Node::from_json_str("{\"n\":12345678901234567891}").unwrap());
    }

    proptest! {
        #[test]
        fn json_roundtrips_through_node(value in arb_json_value()) {
            let node = Node::from_json_value(value.clone()).unwrap();
            let reconstructed = node.to_json_value();
            let node_again = Node::from_json_value(reconstructed.clone()).unwrap();
            prop_assert_eq!(node_again, node);
        }
    }
}
