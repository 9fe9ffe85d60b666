use jsm_core::{
    detect_conflicts, ConflictRecord, ConflictType, Decision, DetectOptions, DocumentFormat,
    Documents, Node, Schema, Side,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (0i64..4).prop_map(|n| json!(n)),
        "[xy]{0,2}".prop_map(Value::String),
    ]
}

fn arb_doc() -> impl Strategy<Value = Value> {
    let inner = arb_leaf().prop_recursive(2, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::btree_map("[abc]", inner, 0..3)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    });
    prop::collection::btree_map("[abcd]", inner, 0..4)
        .prop_map(|map| Value::Object(map.into_iter().collect()))
}

fn node(value: Value) -> Node {
    Node::from_json_value(value).unwrap()
}

fn parse(text: &str) -> Node {
    Node::from_json_str(text).unwrap()
}

fn summary(conflicts: &[ConflictRecord]) -> Vec<(String, ConflictType)> {
    let mut pairs: Vec<_> = conflicts
        .iter()
        .map(|conflict| (conflict.path.to_string(), conflict.conflict_type))
        .collect();
    pairs.sort();
    pairs
}

proptest! {
    #[test]
    fn identical_documents_never_conflict(doc in arb_doc()) {
        let doc = node(doc);
        let conflicts = detect_conflicts(Some(&doc), &doc, &doc, None, &DetectOptions::default());
        prop_assert!(conflicts.is_empty());
        let two_way = detect_conflicts(None, &doc, &doc, None, &DetectOptions::default());
        prop_assert!(two_way.is_empty());
    }

    #[test]
    fn every_record_satisfies_exactly_one_predicate(
        base in arb_doc(),
        input1 in arb_doc(),
        input2 in arb_doc(),
    ) {
        let (base, input1, input2) = (node(base), node(input1), node(input2));
        let options = DetectOptions::default();
        for conflict in detect_conflicts(Some(&base), &input1, &input2, None, &options) {
            let base_value = conflict.value(Side::Base);
            let left = conflict.value(Side::Input1);
            let right = conflict.value(Side::Input2);
            let first = left != base_value;
            let second = right != base_value;
            let holds = [
                (ConflictType::SameChange, first && second && left == right),
                (ConflictType::Input1Only, first && !second),
                (ConflictType::Input2Only, !first && second),
                (ConflictType::TrueConflict, first && second && left != right),
            ];
            let matching: Vec<_> =
                holds.iter().filter(|(_, holds)| *holds).map(|(kind, _)| *kind).collect();
            prop_assert_eq!(matching, vec![conflict.conflict_type], "at {}", conflict.path);
        }
    }

    #[test]
    fn detection_and_merge_are_deterministic(
        base in arb_doc(),
        input1 in arb_doc(),
        input2 in arb_doc(),
    ) {
        let docs = Documents {
            base: Some(node(base)),
            input1: node(input1),
            input2: node(input2),
            schema: None,
        };
        let options = DetectOptions::default();
        let first = docs.detect(&options);
        let second = docs.detect(&options);
        prop_assert_eq!(summary(&first), summary(&second));
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(docs.merge(&first, &options), docs.merge(&second, &options));
    }

    #[test]
    fn default_merge_always_parses(base in arb_doc(), input1 in arb_doc(), input2 in arb_doc()) {
        let (base, input1, input2) = (node(base), node(input1), node(input2));
        let options = DetectOptions::default();
        let conflicts = detect_conflicts(Some(&base), &input1, &input2, None, &options);
        let outcome =
            jsm_core::build_merge(Some(&base), &input1, &input2, &conflicts, None, &options);
        prop_assert!(outcome.is_valid);
        prop_assert!(outcome.validation_error.is_none());
    }

    #[test]
    fn reordering_anchored_items_is_not_a_conflict(
        items in prop::collection::btree_map(0u32..1000, "[a-z]{0,3}", 0..8)
            .prop_map(|map| {
                map.into_iter()
                    .map(|(id, label)| json!({"id": id, "label": label}))
                    .collect::<Vec<_>>()
            })
            .prop_flat_map(|items| (Just(items.clone()), Just(items).prop_shuffle()))
    ) {
        let (ordered, shuffled) = items;
        let schema = Schema::from_json_str(concat!(
            r#"{"properties":{"items":{"type":"array","#,
            r#""items":{"properties":{"id":{"type":"integer"},"label":{}}}}}}"#,
        ))
        .unwrap();
        let base = node(json!({ "items": ordered }));
        let input1 = node(json!({ "items": shuffled }));
        let options = DetectOptions::default();
        let conflicts = detect_conflicts(Some(&base), &input1, &base, Some(&schema), &options);
        prop_assert!(conflicts.is_empty(), "{:?}", summary(&conflicts));
    }
}

#[test]
fn smart_merge_unions_one_sided_members() {
    let docs = Documents::parse(
        DocumentFormat::Json,
        Some(r#"{"settings":{}}"#),
        r#"{"settings":{"a":1}}"#,
        r#"{"settings":{"b":2}}"#,
        Some(concat!(
            r#"{"properties":{"settings":"#,
            r#"{"anyOf":[{"type":"object","additionalProperties":true}]}}}"#,
        )),
    )
    .unwrap();
    let options = DetectOptions::default();
    let mut conflicts = docs.detect(&options);
    assert_eq!(summary(&conflicts), vec![("/settings".to_string(), ConflictType::TrueConflict)]);

    conflicts[0].decide(Decision::Both);
    let outcome = docs.merge(&conflicts, &options);
    assert!(outcome.is_valid);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.document, Some(parse(r#"{"settings":{"a":1,"b":2}}"#)));
}

#[test]
fn smart_merge_failure_falls_back_to_input2() {
    let docs =
        Documents::parse(DocumentFormat::Json, Some(r#"{"x":1}"#), r#"{"x":2}"#, r#"{"x":3}"#, None)
            .unwrap();
    let options = DetectOptions::default();
    let mut conflicts = docs.detect(&options);
    assert_eq!(conflicts.len(), 1);
    conflicts[0].decide(Decision::Both);

    let outcome = docs.merge(&conflicts, &options);
    assert_eq!(outcome.document, Some(parse(r#"{"x":3}"#)));
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("merge failed"));
}

#[test]
fn two_way_addition_has_no_input1_position() {
    let docs = Documents::parse(
        DocumentFormat::Json,
        None,
        r#"{"theme":"dark"}"#,
        r#"{"theme":"dark","lang":"en"}"#,
        None,
    )
    .unwrap();
    let conflicts = docs.detect(&DetectOptions::default());
    assert_eq!(summary(&conflicts), vec![("/lang".to_string(), ConflictType::Input2Only)]);
    assert!(conflicts[0].pointers.input1.is_none());
    assert!(conflicts[0].line_range(Side::Input1, r#"{"theme":"dark"}"#).is_none());
    assert_eq!(conflicts[0].pointers.input2, Some("/lang".parse().unwrap()));
}

const PAYMENT_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "payment": {
      "oneOf": [
        {"type": "object", "properties": {"type": {"const": "card"}, "number": {"type": "string"}}, "required": ["type"]},
        {"type": "object", "properties": {"type": {"const": "crypto"}, "currency": {"type": "string"}, "address": {"type": "string"}}, "required": ["type"]},
        {"type": "object", "properties": {"type": {"const": "cash"}, "amount": {"type": "number"}, "currency": {"type": "string"}}, "required": ["type"]}
      ]
    }
  }
}"#;

#[test]
fn payment_variant_switch_end_to_end() {
    let input2 = r#"{"payment":{"type":"cash","amount":1000,"currency":"USD"}}"#;
    let docs = Documents::parse(
        DocumentFormat::Json,
        Some(r#"{"payment":{"type":"card","number":"1"}}"#),
        r#"{"payment":{"type":"crypto","currency":"BTC","address":"a"}}"#,
        input2,
        Some(PAYMENT_SCHEMA),
    )
    .unwrap();
    let options = DetectOptions::default();
    let conflicts = docs.detect(&options);

    assert_eq!(summary(&conflicts), vec![("/payment".to_string(), ConflictType::TrueConflict)]);
    let conflict = &conflicts[0];
    assert!(conflict.variant_switch);
    assert!(conflict.needs_review);
    assert!(conflict.resolution.includes(Side::Input2));
    assert!(!conflict.resolution.includes(Side::Input1));
    assert!(!conflict.edits_from_input1.is_empty());
    assert!(!conflict.edits_from_input2.is_empty());

    let outcome = docs.merge(&conflicts, &options);
    assert!(outcome.is_valid);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.document, Some(parse(input2)));
    assert!(outcome.issues.iter().all(|issue| issue.severity != jsm_core::Severity::Warning));
}
