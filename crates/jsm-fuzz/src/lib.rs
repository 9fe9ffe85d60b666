//! Fuzzing harnesses for the `jsm` conflict engine.
//!
//! Each public function accepts raw bytes, derives documents (and sometimes a
//! schema) from them and drives one stage of the pipeline. Recoverable errors
//! are swallowed; the harnesses panic only when an engine invariant breaks,
//! which is exactly what the fuzzer is looking for.
//!
//! # Examples
//!
//! ```
//! jsm_fuzz::fuzz_detect(b"three documents");
//! jsm_fuzz::fuzz_merge(&[7, 1, 4, 2, 9, 9, 0, 3]);
//! jsm_fuzz::fuzz_locate(b"{\"a\":[1,2]}");
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use arbitrary::Unstructured;
use jsm_core::{
    build_merge, detect_conflicts, line_range, CompareMode, Decision, DetectOptions, Node, Pointer,
    Schema,
};
use serde_json::{self, json, Map as JsonMap, Number as JsonNumber, Value as JsonValue};

const MAX_DEPTH: usize = 4;
const MAX_ARRAY_LEN: u8 = 6;
const MAX_OBJECT_LEN: u8 = 5;
const MAX_STRING_LEN: u8 = 8;

/// Small key alphabet so that independently generated documents overlap.
const KEYS: [&str; 6] = ["id", "type", "name", "a", "b", "items"];

/// Runs detection over three random documents and checks the invariants of
/// the result.
///
/// ```
/// jsm_fuzz::fuzz_detect(b"seed");
/// ```
pub fn fuzz_detect(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let Some(Case { base, input1, input2, schema, options }) = Case::generate(&mut unstructured)
    else {
        return;
    };

    let conflicts = detect_conflicts(base.as_ref(), &input1, &input2, schema.as_ref(), &options);
    let again = detect_conflicts(base.as_ref(), &input1, &input2, schema.as_ref(), &options);
    assert_eq!(conflicts, again, "detection must be deterministic");

    if let Some(base) = &base {
        if base == &input1 && base == &input2 {
            assert!(conflicts.is_empty(), "identical documents produced conflicts");
        }
    }
    for conflict in &conflicts {
        assert!(
            conflict.base_value != conflict.input1_value
                || conflict.base_value != conflict.input2_value,
            "{} records no change",
            conflict.id
        );
    }
}

/// Detects, applies a random decision to each conflict and builds the merge.
///
/// ```
/// jsm_fuzz::fuzz_merge(b"merge me");
/// ```
pub fn fuzz_merge(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let Some(Case { base, input1, input2, schema, options }) = Case::generate(&mut unstructured)
    else {
        return;
    };

    let mut conflicts =
        detect_conflicts(base.as_ref(), &input1, &input2, schema.as_ref(), &options);
    for conflict in &mut conflicts {
        let decision = match unstructured.int_in_range::<u8>(0..=4).unwrap_or(0) {
            0 => continue,
            1 => Decision::Input1,
            2 => Decision::Input2,
            3 => Decision::Both,
            _ => Decision::Neither,
        };
        conflict.decide(decision);
    }

    let outcome =
        build_merge(base.as_ref(), &input1, &input2, &conflicts, schema.as_ref(), &options);
    assert!(outcome.is_valid, "merged output must parse: {:?}", outcome.validation_error);
    assert_eq!(outcome.document.is_some(), outcome.is_valid);
}

/// Looks up random pointers in arbitrary text and in pretty-printed documents.
///
/// ```
/// jsm_fuzz::fuzz_locate(b"{\n  \"a\": 1\n}");
/// ```
pub fn fuzz_locate(data: &[u8]) {
    if let Ok(text) = std::str::from_utf8(data) {
        let lines = text.lines().count().max(1);
        for pointer in ["", "/a", "/0", "/a/0/b", "/items/1"] {
            if let Ok(pointer) = pointer.parse::<Pointer>() {
                if let Some(range) = line_range(text, &pointer) {
                    assert!(range.start_line < range.end_line_exclusive);
                    assert!(range.end_line_exclusive <= lines);
                }
            }
        }
    }

    let mut unstructured = Unstructured::new(data);
    let Some(node) = random_node(&mut unstructured) else {
        return;
    };
    let text = node.to_pretty_string();
    let mut pointer = Pointer::root();
    let mut current = &node;
    loop {
        assert!(line_range(&text, &pointer).is_some(), "pointer {pointer} must resolve");
        let next = match current {
            Node::Object(members) => {
                members.iter().next().map(|(key, value)| (pointer.key(key.as_str()), value))
            }
            Node::Array(items) => items.last().map(|value| (pointer.index(items.len() - 1), value)),
            _ => None,
        };
        let Some((child, value)) = next else {
            break;
        };
        pointer = child;
        current = value;
    }
}

struct Case {
    base: Option<Node>,
    input1: Node,
    input2: Node,
    schema: Option<Schema>,
    options: DetectOptions,
}

impl Case {
    fn generate(unstructured: &mut Unstructured<'_>) -> Option<Self> {
        let base = random_node(unstructured)?;
        let input1 = mutate(unstructured, &base)?;
        let input2 = mutate(unstructured, &base)?;
        let base = if unstructured.arbitrary().ok()? { Some(base) } else { None };
        let schema =
            if unstructured.arbitrary().ok()? { Some(random_schema(unstructured)?) } else { None };
        let mode = if unstructured.arbitrary().ok()? {
            CompareMode::Sequential
        } else {
            CompareMode::Split
        };
        let options = DetectOptions::default().with_mode(mode);
        Some(Self { base, input1, input2, schema, options })
    }
}

fn random_node(unstructured: &mut Unstructured<'_>) -> Option<Node> {
    let value = json_value_from_unstructured(unstructured, 0).ok()?;
    Node::from_json_value(value).ok()
}

/// Derives a sibling version of `base` so that the documents share structure.
fn mutate(unstructured: &mut Unstructured<'_>, base: &Node) -> Option<Node> {
    let mut value = base.to_json_value();
    mutate_value(unstructured, &mut value, 0).ok()?;
    Node::from_json_value(value).ok()
}

fn mutate_value(
    unstructured: &mut Unstructured<'_>,
    value: &mut JsonValue,
    depth: usize,
) -> Result<(), arbitrary::Error> {
    match unstructured.int_in_range::<u8>(0..=5)? {
        0 => *value = json_value_from_unstructured(unstructured, depth)?,
        1 => match value {
            JsonValue::Object(map) => {
                for (_, child) in map.iter_mut() {
                    mutate_value(unstructured, child, depth + 1)?;
                }
            }
            JsonValue::Array(items) => {
                for child in items.iter_mut() {
                    mutate_value(unstructured, child, depth + 1)?;
                }
            }
            _ => {}
        },
        2 => {
            if let JsonValue::Array(items) = value {
                let len = items.len();
                if len > 1 {
                    let from = unstructured.choose_index(len)?;
                    let to = unstructured.choose_index(len)?;
                    items.swap(from, to);
                }
            }
        }
        3 => {
            if let JsonValue::Object(map) = value {
                let key = *unstructured.choose(&KEYS)?;
                map.insert(key.to_string(), json_leaf(unstructured)?);
            }
        }
        _ => {}
    }
    Ok(())
}

/// A schema over the key alphabet with anchored arrays and a union.
fn random_schema(unstructured: &mut Unstructured<'_>) -> Option<Schema> {
    let item = json!({
        "type": "object",
        "properties": { "id": {}, "name": { "type": "string" } }
    });
    let union = json!({
        "oneOf": [
            { "properties": { "type": { "const": "a" }, "a": {} } },
            { "properties": { "type": { "const": "b" }, "b": {} } }
        ]
    });
    let additional = match unstructured.int_in_range::<u8>(0..=2).ok()? {
        0 => json!(true),
        1 => json!(false),
        _ => json!({ "type": "string" }),
    };
    let value = json!({
        "type": "object",
        "properties": {
            "items": { "type": "array", "items": item },
            "a": union.clone(),
            "b": union
        },
        "additionalProperties": additional
    });
    Schema::from_root(&value).ok()
}

fn json_value_from_unstructured(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<JsonValue, arbitrary::Error> {
    if depth >= MAX_DEPTH {
        return json_leaf(unstructured);
    }

    let choice = unstructured.int_in_range::<u8>(0..=5)?;
    match choice {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        3 => Ok(JsonValue::String(random_string(unstructured)?)),
        4 => {
            let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_ARRAY_LEN)?);
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(json_value_from_unstructured(unstructured, depth + 1)?);
            }
            Ok(JsonValue::Array(items))
        }
        _ => {
            let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_OBJECT_LEN)?);
            let mut map = JsonMap::new();
            for _ in 0..len {
                let key = *unstructured.choose(&KEYS)?;
                let value = json_value_from_unstructured(unstructured, depth + 1)?;
                map.insert(key.to_string(), value);
            }
            Ok(JsonValue::Object(map))
        }
    }
}

fn json_leaf(unstructured: &mut Unstructured<'_>) -> Result<JsonValue, arbitrary::Error> {
    let choice = unstructured.int_in_range::<u8>(0..=3)?;
    match choice {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        _ => Ok(JsonValue::String(random_string(unstructured)?)),
    }
}

fn random_number(unstructured: &mut Unstructured<'_>) -> Result<JsonNumber, arbitrary::Error> {
    if unstructured.arbitrary()? {
        Ok(JsonNumber::from(unstructured.int_in_range::<i64>(-8..=8)?))
    } else {
        let numerator = f64::from(unstructured.arbitrary::<i32>()?);
        let denominator = f64::from(unstructured.int_in_range::<u16>(1..=1024)?);
        JsonNumber::from_f64(numerator / denominator).ok_or(arbitrary::Error::IncorrectFormat)
    }
}

fn random_string(unstructured: &mut Unstructured<'_>) -> Result<String, arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_STRING_LEN)?);
    let mut string = String::with_capacity(len);
    for _ in 0..len {
        let byte = unstructured.int_in_range::<u8>(0x20..=0x7e)?;
        string.push(char::from(byte));
    }
    Ok(string)
}
