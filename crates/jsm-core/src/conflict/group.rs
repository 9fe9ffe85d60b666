//! Assignment of edit operations to semantic owners.

use std::collections::BTreeMap;

use tracing::debug;

use super::{Location, Side};
use crate::anchor::{anchor_fields, find_item, AnchorIndex};
use crate::compare::{differs_at, optional_equal};
use crate::diff::{EditOp, EditScript};
use crate::{CompareMode, Node, Pointer, Schema, Segment};

/// The documents of one detection run.
pub(crate) struct Inputs<'d> {
    pub(crate) base: Option<&'d Node>,
    pub(crate) input1: &'d Node,
    pub(crate) input2: &'d Node,
    pub(crate) schema: Option<&'d Schema>,
    pub(crate) mode: CompareMode,
}

/// One diffed document pair. Edits of the hop are attributed to `side`.
#[derive(Clone, Copy)]
pub(crate) struct Hop<'d> {
    pub(crate) side: Side,
    pub(crate) from: &'d Node,
    pub(crate) to: &'d Node,
}

/// Edits sharing one owner.
#[derive(Debug)]
pub(crate) struct Group {
    pub(crate) location: Location,
    /// Anchor fields of the containing array for [`Location::ArrayItem`].
    pub(crate) fields: Vec<String>,
    pub(crate) input1_edits: Vec<EditOp>,
    pub(crate) input2_edits: Vec<EditOp>,
}

/// An owner candidate together with the op's path relative to it.
struct Owner {
    location: Location,
    fields: Vec<String>,
    relative: Vec<Segment>,
}

impl<'d> Inputs<'d> {
    pub(crate) fn get(&self, side: Side) -> Option<&'d Node> {
        match side {
            Side::Base => self.base,
            Side::Input1 => Some(self.input1),
            Side::Input2 => Some(self.input2),
        }
    }

    /// Document pairs to diff. Without a base the comparison is two-way and
    /// its single hop is attributed to input2.
    pub(crate) fn hops(&self) -> Vec<Hop<'d>> {
        match (self.base, self.mode) {
            (None, _) => vec![Hop { side: Side::Input2, from: self.input1, to: self.input2 }],
            (Some(base), CompareMode::Split) => vec![
                Hop { side: Side::Input1, from: base, to: self.input1 },
                Hop { side: Side::Input2, from: base, to: self.input2 },
            ],
            (Some(base), CompareMode::Sequential) => vec![
                Hop { side: Side::Input1, from: base, to: self.input1 },
                Hop { side: Side::Input2, from: self.input1, to: self.input2 },
            ],
        }
    }

    /// Partitions the edits of every hop by owner.
    pub(crate) fn group(&self, scripts: &[(Hop<'d>, EditScript)]) -> Vec<Group> {
        let mut groups: BTreeMap<Location, Group> = BTreeMap::new();
        for (hop, script) in scripts {
            for op in script {
                for owner in self.owners(hop, &op.path) {
                    if !touches(hop, &owner, &op.path) {
                        debug!(
                            path = %op.path,
                            owner = %owner.location,
                            side = %hop.side,
                            "edit leaves owner unchanged"
                        );
                        continue;
                    }
                    let group = groups.entry(owner.location.clone()).or_insert_with(|| Group {
                        location: owner.location,
                        fields: owner.fields,
                        input1_edits: Vec::new(),
                        input2_edits: Vec::new(),
                    });
                    match hop.side {
                        Side::Input1 => group.input1_edits.push(op.clone()),
                        _ => group.input2_edits.push(op.clone()),
                    }
                }
            }
        }
        groups.into_values().collect()
    }

    /// Union variant index picked by `side` at `path`.
    pub(crate) fn variant_at(&self, schema: &Schema, side: Side, path: &Pointer) -> Option<usize> {
        let value = self.get(side)?.get(path)?;
        schema.select_variant(value).map(|selected| selected.index)
    }

    /// Whether the inputs resolve the union at `path` to different variants.
    ///
    /// Distinct input variants imply that at least one of them differs from
    /// the base's variant, so the base needs no separate check.
    pub(crate) fn variant_switch(&self, schema: &Schema, path: &Pointer) -> bool {
        let left = self.variant_at(schema, Side::Input1, path);
        let right = self.variant_at(schema, Side::Input2, path);
        match (left, right) {
            (Some(left), Some(right)) => left != right,
            _ => false,
        }
    }

    /// Schema governing the value at `path`, navigated with `side`'s values.
    pub(crate) fn schema_at(&self, path: &Pointer, side: Side) -> Option<&'d Schema> {
        let doc = self.get(side);
        let mut schema = self.schema?;
        for (depth, segment) in path.segments().iter().enumerate() {
            let here = doc.and_then(|doc| doc.get_segments(&path.segments()[..depth]));
            schema = schema.child(segment, here)?;
        }
        Some(schema)
    }

    fn owners(&self, hop: &Hop<'d>, path: &Pointer) -> Vec<Owner> {
        let mut owners = Vec::new();
        self.walk(hop, self.schema, Pointer::root(), path.segments(), false, &mut owners);
        owners
    }

    fn walk(
        &self,
        hop: &Hop<'d>,
        schema: Option<&'d Schema>,
        prefix: Pointer,
        rest: &[Segment],
        parent_union: bool,
        out: &mut Vec<Owner>,
    ) {
        if let Some(schema) = schema.filter(|schema| schema.is_union()) {
            if self.variant_switch(schema, &prefix) {
                out.push(Owner {
                    location: Location::UnionObject { path: prefix },
                    fields: Vec::new(),
                    relative: Vec::new(),
                });
                return;
            }
        }

        let here = hop.to.get(&prefix).or_else(|| hop.from.get(&prefix));
        let Some((segment, deeper)) = rest.split_first() else {
            let union_object = schema.is_some_and(Schema::is_union)
                && [hop.from, hop.to]
                    .iter()
                    .any(|doc| matches!(doc.get(&prefix), Some(Node::Object(_))));
            let location = if union_object {
                Location::UnionObject { path: prefix }
            } else if parent_union {
                match prefix.parent() {
                    Some(parent) => Location::UnionObject { path: parent },
                    None => Location::Scalar { path: prefix },
                }
            } else {
                Location::Scalar { path: prefix }
            };
            out.push(Owner { location, fields: Vec::new(), relative: Vec::new() });
            return;
        };

        if matches!(here, Some(Node::Array(_))) {
            let fields = schema
                .and_then(|schema| schema.items(here))
                .map(anchor_fields)
                .unwrap_or_default();
            if !fields.is_empty() && self.anchored(hop, &prefix, segment, deeper, &fields, out) {
                return;
            }
        }

        let child = schema.and_then(|schema| schema.child(segment, here));
        let union_object =
            schema.is_some_and(Schema::is_union) && matches!(here, Some(Node::Object(_)));
        self.walk(hop, child, prefix.child(segment.clone()), deeper, union_object, out);
    }

    /// Registers an owner for every anchored item the op touches. When some
    /// touched item has no anchor key nothing is registered and the caller
    /// keeps walking positionally, so the op gets exactly one owner.
    fn anchored(
        &self,
        hop: &Hop<'d>,
        array: &Pointer,
        segment: &Segment,
        deeper: &[Segment],
        fields: &[String],
        out: &mut Vec<Owner>,
    ) -> bool {
        let Some(position) = segment.as_index() else {
            return false;
        };
        let mut keyed: Vec<Owner> = Vec::new();
        for doc in [hop.from, hop.to] {
            let Some(items) = doc.get(array).and_then(Node::as_array) else {
                continue;
            };
            if position >= items.len() {
                continue;
            }
            let index = AnchorIndex::build(items, fields);
            let Some(key) = index.key_at(position).map(str::to_string) else {
                debug!(%array, position, "item has no anchor key, grouping by position");
                return false;
            };
            let location = Location::ArrayItem { array: array.clone(), anchor: key };
            if !keyed.iter().any(|owner| owner.location == location) {
                keyed.push(Owner { location, fields: fields.to_vec(), relative: deeper.to_vec() });
            }
        }
        if keyed.is_empty() {
            return false;
        }
        out.extend(keyed);
        true
    }
}

/// Whether the value the op touches differs between the hop's documents,
/// resolved relative to the owner.
fn touches(hop: &Hop<'_>, owner: &Owner, path: &Pointer) -> bool {
    match &owner.location {
        Location::ArrayItem { array, anchor } => !optional_equal(
            item_member(hop.from, array, &owner.fields, anchor, &owner.relative),
            item_member(hop.to, array, &owner.fields, anchor, &owner.relative),
        ),
        Location::Scalar { .. } | Location::UnionObject { .. } => {
            differs_at(Some(hop.from), Some(hop.to), path)
        }
    }
}

fn item_member<'a>(
    doc: &'a Node,
    array: &Pointer,
    fields: &[String],
    anchor: &str,
    relative: &[Segment],
) -> Option<&'a Node> {
    let (_, item) = find_item(doc.get(array)?, fields, anchor)?;
    item.get_segments(relative)
}
