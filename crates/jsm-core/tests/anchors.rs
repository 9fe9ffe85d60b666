use jsm_core::{ConflictType, DetectOptions, DocumentFormat, Documents, Location, Node};

const LIST_SCHEMA: &str =
    r#"{"properties":{"l":{"type":"array","items":{"properties":{"id":{},"v":{}}}}}}"#;

fn documents(base: &str, input1: &str, input2: &str) -> Documents {
    Documents::parse(DocumentFormat::Json, Some(base), input1, input2, Some(LIST_SCHEMA)).unwrap()
}

fn parse(text: &str) -> Node {
    Node::from_json_str(text).unwrap()
}

fn merged(docs: &Documents) -> Node {
    let options = DetectOptions::default();
    let outcome = docs.merge(&docs.detect(&options), &options);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    outcome.document.expect("merge parses")
}

#[test]
fn removing_the_anchor_field_keeps_the_item() {
    let input1 = r#"{"l":[{"v":0}]}"#;
    let docs = documents(r#"{"l":[{"id":1,"v":0}]}"#, input1, r#"{"l":[{"id":1,"v":0}]}"#);
    let conflicts = docs.detect(&DetectOptions::default());

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].location, Location::Scalar { path: "/l/0/id".parse().unwrap() });
    assert_eq!(conflicts[0].conflict_type, ConflictType::Input1Only);
    assert_eq!(merged(&docs), parse(input1));
}

#[test]
fn adding_an_anchor_field_is_a_positional_change() {
    let input2 = r#"{"l":[{"id":7,"v":0}]}"#;
    let docs = documents(r#"{"l":[{"v":0}]}"#, r#"{"l":[{"v":0}]}"#, input2);
    let conflicts = docs.detect(&DetectOptions::default());

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path.to_string(), "/l/0/id");
    assert_eq!(conflicts[0].conflict_type, ConflictType::Input2Only);
    assert_eq!(merged(&docs), parse(input2));
}

#[test]
fn rekeyed_item_replaces_the_old_identity() {
    let input1 = r#"{"l":[{"id":1,"v":0},{"id":3,"v":0}]}"#;
    let base = r#"{"l":[{"id":1,"v":0},{"id":2,"v":0}]}"#;
    let docs = documents(base, input1, base);
    let conflicts = docs.detect(&DetectOptions::default());

    // one record for the identity that disappears, one for the new one
    let anchors: Vec<_> = conflicts
        .iter()
        .map(|conflict| match &conflict.location {
            Location::ArrayItem { anchor, .. } => anchor.as_str(),
            other => panic!("unexpected owner {other}"),
        })
        .collect();
    assert_eq!(anchors, vec!["id:2", "id:3"]);
    assert!(conflicts.iter().all(|conflict| conflict.conflict_type == ConflictType::Input1Only));
    assert_eq!(merged(&docs), parse(input1));
}

#[test]
fn keyed_and_unkeyed_items_merge_independently() {
    let docs = documents(
        r#"{"l":[{"id":1,"v":0},{"v":0}]}"#,
        r#"{"l":[{"id":1,"v":1},{"v":0}]}"#,
        r#"{"l":[{"id":1,"v":0},{"v":5}]}"#,
    );
    let conflicts = docs.detect(&DetectOptions::default());

    assert_eq!(conflicts.len(), 2);
    assert!(matches!(
        &conflicts[0].location,
        Location::ArrayItem { anchor, .. } if anchor == "id:1"
    ));
    assert_eq!(conflicts[0].conflict_type, ConflictType::Input1Only);
    assert_eq!(conflicts[1].location, Location::Scalar { path: "/l/1/v".parse().unwrap() });
    assert_eq!(conflicts[1].conflict_type, ConflictType::Input2Only);
    assert_eq!(merged(&docs), parse(r#"{"l":[{"id":1,"v":1},{"v":5}]}"#));
}

#[test]
fn string_and_number_anchors_are_distinct_items() {
    let input2 = r#"{"l":[{"id":1,"v":0},{"id":"1","v":9}]}"#;
    let docs = documents(r#"{"l":[{"id":1,"v":0}]}"#, r#"{"l":[{"id":1,"v":0}]}"#, input2);
    let conflicts = docs.detect(&DetectOptions::default());

    assert_eq!(conflicts.len(), 1);
    assert!(matches!(
        &conflicts[0].location,
        Location::ArrayItem { anchor, .. } if anchor == r#"id:"1""#
    ));
    assert_eq!(merged(&docs), parse(input2));
}

#[test]
fn integers_beyond_double_precision_are_compared_exactly() {
    let docs = Documents::parse(
        DocumentFormat::Json,
        Some(r#"{"id":9007199254740992,"n":12345678901234567891}"#),
        r#"{"id":9007199254740993,"n":12345678901234567891}"#,
        r#"{"id":9007199254740992,"n":12345678901234567891}"#,
        None,
    )
    .unwrap();
    let options = DetectOptions::default();
    let conflicts = docs.detect(&options);

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path.to_string(), "/id");
    assert_eq!(conflicts[0].conflict_type, ConflictType::Input1Only);

    let outcome = docs.merge(&conflicts, &options);
    assert_eq!(outcome.content, "{\n  \"id\": 9007199254740993,\n  \"n\": 12345678901234567891\n}");
}
