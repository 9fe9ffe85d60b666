//! Builds the merged document from resolved conflicts.
//!
//! The result starts as a copy of the base (input2 in two-way mode) and every
//! conflict writes its chosen value into it, shallowest paths first so that
//! finer conflicts refine coarser ones. Failures to write a single conflict
//! are recorded and the remaining conflicts still apply.

pub(crate) mod apply;
mod smart;

use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::anchor::{anchor_fields, AnchorIndex};
use crate::conflict::{ConflictRecord, ConflictType, Inputs, Location, Side};
use crate::locate::{self, LineRange};
use crate::schema::validate;
use crate::{ApplyError, DetectOptions, Node, Pointer, Schema};

use smart::smart_merge;

/// How serious an [`Issue`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Something the engine did on its own that went well.
    Info,
    /// Something that needs attention but did not stop the merge.
    Warning,
    /// The merged document is unusable.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A diagnostic attached to the merged document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Seriousness.
    pub severity: Severity,
    /// Human readable description.
    pub message: String,
    /// Conflict the issue stems from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_id: Option<String>,
    /// Location in the merged document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Pointer>,
    /// Lines of the merged content the issue refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<LineRange>,
    /// Whether the engine made a choice a person should confirm.
    pub review: bool,
}

impl Issue {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            conflict_id: None,
            path: None,
            range: None,
            review: false,
        }
    }

    fn for_conflict(mut self, conflict: &ConflictRecord, path: &Pointer) -> Self {
        self.conflict_id = Some(conflict.id.clone());
        self.path = Some(path.clone());
        self
    }

    fn flagged(mut self) -> Self {
        self.review = true;
        self
    }
}

/// Result of [`build_merge`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Pretty-printed merged JSON.
    pub content: String,
    /// Whether `content` parses back.
    pub is_valid: bool,
    /// Parse failure of `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    /// Conflicts whose value could not be applied as chosen.
    pub warnings: Vec<String>,
    /// Diagnostics for renderers.
    pub issues: Vec<Issue>,
    /// The merged document, when `content` is valid.
    #[serde(skip)]
    pub document: Option<Node>,
}

/// Builds the merged document.
///
/// ```
/// # use jsm_core::{conflict::detect_conflicts, merge::build_merge, DetectOptions, Node};
/// let base = Node::from_json_str(r#"{"x":1}"#)?;
/// let input1 = Node::from_json_str(r#"{"x":2}"#)?;
/// let input2 = Node::from_json_str(r#"{"x":3}"#)?;
/// let options = DetectOptions::default();
/// let conflicts = detect_conflicts(Some(&base), &input1, &input2, None, &options);
/// let outcome = build_merge(Some(&base), &input1, &input2, &conflicts, None, &options);
/// assert!(outcome.is_valid);
/// assert_eq!(outcome.document, Some(input2));
/// # Ok::<(), jsm_core::CanonicalizeError>(())
/// ```
#[must_use]
pub fn build_merge(
    base: Option<&Node>,
    input1: &Node,
    input2: &Node,
    conflicts: &[ConflictRecord],
    schema: Option<&Schema>,
    options: &DetectOptions,
) -> MergeOutcome {
    let started = Instant::now();
    let inputs = Inputs { base, input1, input2, schema, mode: options.mode() };
    let mut builder = Builder {
        inputs: &inputs,
        result: base.unwrap_or(input2).clone(),
        claimed: conflicts.iter().flat_map(claims).collect(),
        applied: BTreeSet::new(),
        warnings: Vec::new(),
        issues: Vec::new(),
    };

    let mut order: Vec<&ConflictRecord> = conflicts.iter().collect();
    order.sort_by(|a, b| a.path.len().cmp(&b.path.len()).then_with(|| a.path.cmp(&b.path)));
    for conflict in order {
        builder.resolve(conflict);
    }

    let outcome = builder.finish(schema);
    let elapsed = started.elapsed();
    if elapsed > options.budget() {
        warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = options.budget().as_millis() as u64,
            conflicts = conflicts.len(),
            "merge exceeded its latency budget"
        );
    }
    info!(
        valid = outcome.is_valid,
        warnings = outcome.warnings.len(),
        issues = outcome.issues.len(),
        "merge finished"
    );
    outcome
}

/// Paths a conflict owns; sibling copies never write into them.
fn claims(conflict: &ConflictRecord) -> Vec<Pointer> {
    match &conflict.location {
        Location::ArrayItem { array, .. } => vec![array.clone(), conflict.path.clone()],
        Location::Scalar { path } | Location::UnionObject { path } => vec![path.clone()],
    }
}

struct Builder<'a, 'd> {
    inputs: &'a Inputs<'d>,
    result: Node,
    claimed: BTreeSet<Pointer>,
    applied: BTreeSet<Pointer>,
    warnings: Vec<String>,
    issues: Vec<Issue>,
}

impl Builder<'_, '_> {
    fn resolve(&mut self, conflict: &ConflictRecord) {
        let resolution = conflict.resolution;
        let includes = (resolution.includes(Side::Input1), resolution.includes(Side::Input2));
        let (value, source, siblings) = match includes {
            (true, true) => {
                let (value, source) = self.both(conflict);
                (value, source, None)
            }
            (true, false) => (conflict.input1_value.clone(), Side::Input1, Some(Side::Input1)),
            (false, true) => (conflict.input2_value.clone(), Side::Input2, Some(Side::Input2)),
            (false, false) => (conflict.base_value.clone(), Side::Base, None),
        };
        debug!(id = %conflict.id, location = %conflict.location, ?source, "applying conflict");

        match self.write(conflict, value, source) {
            Ok(Some(path)) => {
                self.applied.insert(path);
            }
            Ok(None) => {}
            Err(err) => {
                let message = format!(
                    "{}: could not apply {} value at {}: {err}",
                    conflict.id, source, conflict.path
                );
                warn!(id = %conflict.id, error = %err, "conflict application failed");
                self.issues.push(
                    Issue::new(Severity::Warning, message.clone())
                        .for_conflict(conflict, &conflict.path),
                );
                self.warnings.push(message);
                return;
            }
        }

        if let Some(side) = siblings {
            self.merge_siblings(conflict, side);
        }
    }

    /// Value for a conflict with both sides included.
    fn both(&mut self, conflict: &ConflictRecord) -> (Option<Node>, Side) {
        if conflict.conflict_type != ConflictType::TrueConflict {
            let source = match conflict.conflict_type {
                ConflictType::Input1Only => Side::Input1,
                _ => Side::Input2,
            };
            return (conflict.value(source).cloned(), source);
        }

        let path = &conflict.path;
        let attempt = match (&conflict.input1_value, &conflict.input2_value) {
            (Some(left), Some(right)) => {
                let schema = self.inputs.schema_at(path, Side::Input2);
                smart_merge(left, right, schema, path)
            }
            _ => Err(crate::SmartMergeError::Missing { path: path.to_string() }),
        };
        self.issues.push(
            Issue::new(
                Severity::Warning,
                format!("{}: both sides kept for a true conflict at {path}", conflict.id),
            )
            .for_conflict(conflict, path)
            .flagged(),
        );
        match attempt {
            Ok(merged) => {
                self.issues.push(
                    Issue::new(
                        Severity::Info,
                        format!("{}: smart merge combined both sides", conflict.id),
                    )
                    .for_conflict(conflict, path),
                );
                (Some(merged), Side::Input2)
            }
            Err(err) => {
                let message = format!("{}: {err}; kept input2", conflict.id);
                debug!(id = %conflict.id, reason = %err, "smart merge refused");
                self.issues.push(
                    Issue::new(Severity::Warning, message.clone()).for_conflict(conflict, path),
                );
                self.warnings.push(message);
                (conflict.input2_value.clone(), Side::Input2)
            }
        }
    }

    /// Writes `value` at the conflict's location. Returns the path written.
    fn write(
        &mut self,
        conflict: &ConflictRecord,
        value: Option<Node>,
        source: Side,
    ) -> Result<Option<Pointer>, ApplyError> {
        match &conflict.location {
            Location::Scalar { path } | Location::UnionObject { path } => match value {
                Some(value) => {
                    apply::set(&mut self.result, path, value)?;
                    Ok(Some(path.clone()))
                }
                None if self.result.get(path).is_none() => Ok(None),
                None => apply::remove(&mut self.result, path).map(|_| None),
            },
            Location::ArrayItem { array, anchor } => {
                let fields = self.anchor_fields(array);
                let preferred = conflict
                    .pointers
                    .get(source)
                    .and_then(|pointer| pointer.last())
                    .and_then(|segment| segment.as_index());
                let target = apply::resolve_mut(&mut self.result, array)?;
                let found = target.type_name();
                let Node::Array(items) = target else {
                    return Err(ApplyError::TypeMismatch {
                        path: array.to_string(),
                        expected: "array",
                        found,
                    });
                };
                let position = AnchorIndex::build(items, &fields).position(anchor);
                match (position, value) {
                    (Some(position), Some(value)) => {
                        items[position] = value;
                        Ok(Some(array.index(position)))
                    }
                    (Some(position), None) => {
                        items.remove(position);
                        Ok(None)
                    }
                    (None, Some(value)) => {
                        let position = preferred.unwrap_or(items.len()).min(items.len());
                        items.insert(position, value);
                        Ok(Some(array.index(position)))
                    }
                    (None, None) => Ok(None),
                }
            }
        }
    }

    fn anchor_fields(&self, array: &Pointer) -> Vec<String> {
        let value = self.result.get(array);
        self.inputs
            .schema_at(array, Side::Input2)
            .and_then(|schema| schema.items(value))
            .map(anchor_fields)
            .unwrap_or_default()
    }

    /// Copies `side`'s other members of the conflict's parent object.
    fn merge_siblings(&mut self, conflict: &ConflictRecord, side: Side) {
        let path = match &conflict.location {
            Location::Scalar { path } | Location::UnionObject { path } => path,
            Location::ArrayItem { .. } => return,
        };
        let Some(parent) = path.parent() else {
            return;
        };
        let Some(Node::Object(members)) = self.inputs.get(side).and_then(|doc| doc.get(&parent))
        else {
            return;
        };
        if !matches!(self.result.get(&parent), Some(Node::Object(_))) {
            return;
        }
        for (key, value) in members {
            let sibling = parent.key(key.as_str());
            let owned = |paths: &BTreeSet<Pointer>| {
                paths.iter().any(|other| other.starts_with(&sibling) || sibling.starts_with(other))
            };
            if owned(&self.claimed)
                || owned(&self.applied)
                || self.result.get(&sibling) == Some(value)
            {
                continue;
            }
            if apply::set(&mut self.result, &sibling, value.clone()).is_ok() {
                debug!(path = %sibling, %side, "copied sibling member");
                self.applied.insert(sibling);
            }
        }
    }

    fn finish(mut self, schema: Option<&Schema>) -> MergeOutcome {
        let content = self.result.to_pretty_string();
        let (is_valid, validation_error, document) = match Node::from_json_str(&content) {
            Ok(document) => (true, None, Some(document)),
            Err(err) => {
                let message = format!("merged document does not parse: {err}");
                let mut issue = Issue::new(Severity::Error, message.clone());
                issue.range = Some(locate::whole_document(&content));
                self.issues.push(issue);
                (false, Some(message), None)
            }
        };

        if let (Some(schema), Some(document)) = (schema, document.as_ref()) {
            for violation in validate(document, schema) {
                let mut issue =
                    Issue::new(Severity::Warning, format!("schema violation {violation}"));
                issue.path = Some(violation.pointer);
                self.issues.push(issue);
            }
        }

        for issue in &mut self.issues {
            if issue.range.is_none() {
                issue.range =
                    issue.path.as_ref().and_then(|path| locate::line_range(&content, path));
            }
        }

        MergeOutcome {
            content,
            is_valid,
            validation_error,
            warnings: self.warnings,
            issues: self.issues,
            document,
        }
    }
}
