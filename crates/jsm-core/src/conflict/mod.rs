//! Conflict records and the detection pipeline.
//!
//! Detection diffs the document pairs required by the compare mode, assigns
//! every edit to a semantic owner ([`Location`]), and classifies each owner by
//! reading its value in every document. The result is a flat list of
//! [`ConflictRecord`]s sorted by path, with ids `conflict-1`, `conflict-2`, …
//! assigned in that order.

mod classify;
mod group;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff::{diff_nodes, EditOp};
use crate::locate::{self, LineRange};
use crate::{DetectOptions, Node, Pointer, Schema};

pub(crate) use group::Inputs;

/// How the two inputs relate to the base at one location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    /// Both inputs made the same change.
    SameChange,
    /// Only input1 changed the value (two-way: the value exists only in input1).
    Input1Only,
    /// Only input2 changed the value (two-way: the value exists only in input2).
    Input2Only,
    /// Both inputs changed the value differently, or picked different union variants.
    TrueConflict,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SameChange => "same-change",
            Self::Input1Only => "input1-only",
            Self::Input2Only => "input2-only",
            Self::TrueConflict => "true-conflict",
        })
    }
}

/// Whether one side's value goes into the merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionState {
    /// The side's value is left out.
    #[default]
    Excluded,
    /// The side's value is used.
    Included,
}

/// Per-side resolution of a conflict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// State of input1 ("theirs").
    pub input1: ResolutionState,
    /// State of input2 ("ours").
    pub input2: ResolutionState,
}

impl Resolution {
    /// Both sides included.
    #[must_use]
    pub fn both() -> Self {
        Self { input1: ResolutionState::Included, input2: ResolutionState::Included }
    }

    /// Only `side` included. `Side::Base` includes neither input.
    #[must_use]
    pub fn only(side: Side) -> Self {
        match side {
            Side::Input1 => {
                Self { input1: ResolutionState::Included, input2: ResolutionState::Excluded }
            }
            Side::Input2 => {
                Self { input1: ResolutionState::Excluded, input2: ResolutionState::Included }
            }
            Side::Base => Self::neither(),
        }
    }

    /// Neither side included.
    #[must_use]
    pub fn neither() -> Self {
        Self::default()
    }

    /// Whether `side` is included. The base is never "included".
    #[must_use]
    pub fn includes(&self, side: Side) -> bool {
        match side {
            Side::Input1 => self.input1 == ResolutionState::Included,
            Side::Input2 => self.input2 == ResolutionState::Included,
            Side::Base => false,
        }
    }
}

/// One of the compared documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The common ancestor.
    Base,
    /// The first modified copy.
    Input1,
    /// The second modified copy.
    Input2,
}

impl Side {
    /// All sides in document order.
    pub const ALL: [Side; 3] = [Side::Base, Side::Input1, Side::Input2];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Base => "base",
            Self::Input1 => "input1",
            Self::Input2 => "input2",
        })
    }
}

/// The semantic owner of a group of edits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Location {
    /// A value addressed by its exact path.
    Scalar {
        /// Path of the value.
        path: Pointer,
    },
    /// An array item identified by anchor key rather than position.
    ArrayItem {
        /// Path of the containing array.
        array: Pointer,
        /// Anchor key of the item.
        anchor: String,
    },
    /// A union-typed object treated as one unit.
    UnionObject {
        /// Path of the object.
        path: Pointer,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { path } | Self::UnionObject { path } => write!(f, "{path}"),
            Self::ArrayItem { array, anchor } => write!(f, "{array}#{anchor}"),
        }
    }
}

/// Where a conflict's value lives in each document; `None` when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePointers {
    /// Pointer into the base document.
    pub base: Option<Pointer>,
    /// Pointer into input1.
    pub input1: Option<Pointer>,
    /// Pointer into input2.
    pub input2: Option<Pointer>,
}

impl SidePointers {
    /// The pointer for one side.
    #[must_use]
    pub fn get(&self, side: Side) -> Option<&Pointer> {
        match side {
            Side::Base => self.base.as_ref(),
            Side::Input1 => self.input1.as_ref(),
            Side::Input2 => self.input2.as_ref(),
        }
    }
}

/// One semantically atomic difference between the documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    /// Stable identifier within one detection run.
    pub id: String,
    /// Coarsest path representing the change.
    pub path: Pointer,
    /// Semantic owner.
    pub location: Location,
    /// Value in the base document.
    pub base_value: Option<Node>,
    /// Value in input1.
    pub input1_value: Option<Node>,
    /// Value in input2.
    pub input2_value: Option<Node>,
    /// Classification.
    pub conflict_type: ConflictType,
    /// Edits of the first hop that touch this location.
    pub edits_from_input1: Vec<EditOp>,
    /// Edits of the second hop that touch this location.
    pub edits_from_input2: Vec<EditOp>,
    /// Which sides go into the merge.
    pub resolution: Resolution,
    /// Whether a person should look at this conflict.
    pub needs_review: bool,
    /// Whether the inputs picked different union variants here.
    pub variant_switch: bool,
    /// Concrete pointers per document.
    pub pointers: SidePointers,
}

impl ConflictRecord {
    /// The value of one side.
    #[must_use]
    pub fn value(&self, side: Side) -> Option<&Node> {
        match side {
            Side::Base => self.base_value.as_ref(),
            Side::Input1 => self.input1_value.as_ref(),
            Side::Input2 => self.input2_value.as_ref(),
        }
    }

    /// Lines occupied by this conflict in the formatted `text` of `side`.
    ///
    /// Returns `None` when the value does not exist on that side.
    #[must_use]
    pub fn line_range(&self, side: Side, text: &str) -> Option<LineRange> {
        locate::line_range(text, self.pointers.get(side)?)
    }

    /// Overrides the resolution with an explicit decision.
    pub fn decide(&mut self, decision: Decision) {
        self.resolution = decision.resolution();
        self.needs_review = false;
    }
}

/// An explicit choice for one conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Take input1.
    Input1,
    /// Take input2.
    Input2,
    /// Take both, smart-merging when they differ.
    Both,
    /// Keep the base.
    Neither,
}

impl Decision {
    /// The resolution this decision stands for.
    #[must_use]
    pub fn resolution(self) -> Resolution {
        match self {
            Self::Input1 => Resolution::only(Side::Input1),
            Self::Input2 => Resolution::only(Side::Input2),
            Self::Both => Resolution::both(),
            Self::Neither => Resolution::neither(),
        }
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input1" | "theirs" => Ok(Self::Input1),
            "input2" | "ours" => Ok(Self::Input2),
            "both" => Ok(Self::Both),
            "neither" | "base" => Ok(Self::Neither),
            other => Err(format!("unknown decision `{other}`")),
        }
    }
}

/// Applies decisions by conflict id and returns the ids that matched nothing.
///
/// ```
/// # use std::collections::BTreeMap;
/// # use jsm_core::{conflict::{apply_decisions, detect_conflicts, Decision, Side}, DetectOptions, Node};
/// let base = Node::from_json_str(r#"{"x":1}"#)?;
/// let mut conflicts = detect_conflicts(
///     Some(&base),
///     &Node::from_json_str(r#"{"x":2}"#)?,
///     &Node::from_json_str(r#"{"x":3}"#)?,
///     None,
///     &DetectOptions::default(),
/// );
/// let decisions = BTreeMap::from([
///     ("conflict-1".to_string(), Decision::Input1),
///     ("conflict-9".to_string(), Decision::Both),
/// ]);
/// assert_eq!(apply_decisions(&mut conflicts, &decisions), vec!["conflict-9".to_string()]);
/// assert!(conflicts[0].resolution.includes(Side::Input1));
/// assert!(!conflicts[0].needs_review);
/// # Ok::<(), jsm_core::CanonicalizeError>(())
/// ```
pub fn apply_decisions(
    conflicts: &mut [ConflictRecord],
    decisions: &BTreeMap<String, Decision>,
) -> Vec<String> {
    let mut unknown = Vec::new();
    for (id, decision) in decisions {
        match conflicts.iter_mut().find(|conflict| &conflict.id == id) {
            Some(conflict) => conflict.decide(*decision),
            None => unknown.push(id.clone()),
        }
    }
    unknown
}

/// Detects conflicts between parsed documents.
///
/// Without `base` the comparison is two-way and the compare mode is ignored.
///
/// ```
/// # use jsm_core::{conflict::{detect_conflicts, ConflictType}, DetectOptions, Node};
/// let input1 = Node::from_json_str(r#"{"theme":"dark"}"#)?;
/// let input2 = Node::from_json_str(r#"{"theme":"dark","lang":"en"}"#)?;
/// let conflicts = detect_conflicts(None, &input1, &input2, None, &DetectOptions::default());
/// assert_eq!(conflicts.len(), 1);
/// assert_eq!(conflicts[0].path.to_string(), "/lang");
/// assert_eq!(conflicts[0].conflict_type, ConflictType::Input2Only);
/// assert!(conflicts[0].pointers.input1.is_none());
/// # Ok::<(), jsm_core::CanonicalizeError>(())
/// ```
#[must_use]
pub fn detect_conflicts(
    base: Option<&Node>,
    input1: &Node,
    input2: &Node,
    schema: Option<&Schema>,
    options: &DetectOptions,
) -> Vec<ConflictRecord> {
    let started = Instant::now();
    let inputs = Inputs { base, input1, input2, schema, mode: options.mode() };

    let scripts: Vec<_> = inputs
        .hops()
        .into_iter()
        .map(|hop| {
            let script = diff_nodes(hop.from, hop.to);
            debug!(side = %hop.side, edits = script.len(), "computed edit script");
            (hop, script)
        })
        .collect();

    let mut records: Vec<ConflictRecord> =
        inputs.group(&scripts).into_iter().filter_map(|group| inputs.classify(group)).collect();
    records.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.location.cmp(&b.location)));
    for (number, record) in records.iter_mut().enumerate() {
        record.id = format!("conflict-{}", number + 1);
    }

    let elapsed = started.elapsed();
    if elapsed > options.budget() {
        warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = options.budget().as_millis() as u64,
            conflicts = records.len(),
            "conflict detection exceeded its latency budget"
        );
    }
    info!(
        conflicts = records.len(),
        review = records.iter().filter(|record| record.needs_review).count(),
        "conflict detection finished"
    );
    records
}

/// Renders conflicts as text hunks.
///
/// Each hunk starts with `@ <location> <type>`, followed by the base value
/// (`=`), input1 (`-`) and input2 (`+`); absent values are left out. A `!`
/// after the type marks conflicts needing review.
///
/// ```
/// # use jsm_core::{conflict::{detect_conflicts, render_conflicts}, DetectOptions, Node};
/// let base = Node::from_json_str(r#"{"x":1}"#)?;
/// let conflicts = detect_conflicts(
///     Some(&base),
///     &Node::from_json_str(r#"{"x":2}"#)?,
///     &Node::from_json_str(r#"{"x":3}"#)?,
///     None,
///     &DetectOptions::default(),
/// );
/// assert_eq!(render_conflicts(&conflicts), "@ /x true-conflict !\n= 1\n- 2\n+ 3\n");
/// # Ok::<(), jsm_core::CanonicalizeError>(())
/// ```
#[must_use]
pub fn render_conflicts(conflicts: &[ConflictRecord]) -> String {
    let mut output = String::new();
    for conflict in conflicts {
        output.push_str("@ ");
        output.push_str(&conflict.location.to_string());
        output.push(' ');
        output.push_str(&conflict.conflict_type.to_string());
        if conflict.needs_review {
            output.push_str(" !");
        }
        output.push('\n');
        for (marker, side) in [("= ", Side::Base), ("- ", Side::Input1), ("+ ", Side::Input2)] {
            if let Some(value) = conflict.value(side) {
                output.push_str(marker);
                output.push_str(&value.to_compact_string());
                output.push('\n');
            }
        }
    }
    output
}
