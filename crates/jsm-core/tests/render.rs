use jsm_core::{
    diff::diff_nodes, line_range, render_conflicts, DetectOptions, DocumentFormat, Documents,
    LineRange, Node, Pointer, Severity, Side,
};

fn documents(base: &str, input1: &str, input2: &str) -> Documents {
    Documents::parse(DocumentFormat::Json, Some(base), input1, input2, None).unwrap()
}

#[test]
fn render_conflicts_lists_every_side() {
    let docs =
        documents(r#"{"a":1,"b":{"c":true}}"#, r#"{"a":2,"b":{"c":true}}"#, r#"{"a":3,"b":{}}"#);
    let rendered = render_conflicts(&docs.detect(&DetectOptions::default()));
    assert_eq!(
        rendered,
        "@ /a true-conflict !\n= 1\n- 2\n+ 3\n@ /b/c input2-only\n= true\n- true\n"
    );
}

#[test]
fn render_patch_emits_rfc6902_operations() {
    let lhs = Node::from_json_str(r#"{"a":1,"l":[1,2,3]}"#).unwrap();
    let rhs = Node::from_json_str(r#"{"b":null,"l":[1,4]}"#).unwrap();
    let patch = diff_nodes(&lhs, &rhs).render_patch().expect("render_patch");
    assert_eq!(
        patch,
        concat!(
            r#"[{"op":"remove","path":"/a"},"#,
            r#"{"op":"replace","path":"/l/1","value":4},"#,
            r#"{"op":"remove","path":"/l/2"},"#,
            r#"{"op":"add","path":"/b","value":null}]"#
        )
    );
}

#[test]
fn conflict_ranges_follow_side_pointers() {
    let input1 = "{\n  \"list\": [\n    {\n      \"id\": 1\n    },\n    2\n  ]\n}";
    let docs = documents(r#"{"list":[{"id":1},1]}"#, input1, r#"{"list":[{"id":1},1]}"#);
    let conflicts = docs.detect(&DetectOptions::default());
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].line_range(Side::Input1, input1),
        Some(LineRange { start_line: 5, end_line_exclusive: 6 })
    );
    assert_eq!(
        line_range(input1, &"/list/0".parse::<Pointer>().unwrap()),
        Some(LineRange { start_line: 2, end_line_exclusive: 5 })
    );
}

#[test]
fn review_issues_point_into_merged_content() {
    let docs = documents(r#"{"keep":0,"x":1}"#, r#"{"keep":0,"x":2}"#, r#"{"keep":0,"x":3}"#);
    let options = DetectOptions::default();
    let conflicts = docs.detect(&options);
    let outcome = docs.merge(&conflicts, &options);
    assert_eq!(outcome.content, "{\n  \"keep\": 0,\n  \"x\": 3\n}");
    assert!(outcome.issues.is_empty());

    let mut accepted = conflicts.clone();
    accepted[0].decide(jsm_core::Decision::Both);
    let outcome = docs.merge(&accepted, &options);
    let review = outcome.issues.iter().find(|issue| issue.review).expect("review issue");
    assert_eq!(review.severity, Severity::Warning);
    assert_eq!(review.conflict_id.as_deref(), Some("conflict-1"));
    assert_eq!(review.range, Some(LineRange { start_line: 2, end_line_exclusive: 3 }));
}
