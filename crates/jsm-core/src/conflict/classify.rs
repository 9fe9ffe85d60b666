use tracing::debug;

use super::group::{Group, Inputs};
use super::{ConflictRecord, ConflictType, Location, Resolution, Side, SidePointers};
use crate::anchor::find_item;
use crate::compare::optional_equal;
use crate::{CompareMode, Node, Pointer};

impl<'d> Inputs<'d> {
    /// Reads the owner's value in every document and classifies the group.
    /// Returns `None` for groups where nothing changed.
    pub(crate) fn classify(&self, group: Group) -> Option<ConflictRecord> {
        let [base, input1, input2] = Side::ALL.map(|side| self.locate(side, &group));
        let base_value = base.as_ref().map(|(_, value)| *value);
        let input1_value = input1.as_ref().map(|(_, value)| *value);
        let input2_value = input2.as_ref().map(|(_, value)| *value);

        let Some(mut conflict_type) = self.outcome(base_value, input1_value, input2_value) else {
            debug!(owner = %group.location, "dropping group without effective change");
            return None;
        };

        let variant_switch = match &group.location {
            Location::UnionObject { path } => self
                .schema_at(path, Side::Input2)
                .is_some_and(|schema| schema.is_union() && self.variant_switch(schema, path)),
            _ => false,
        };
        if variant_switch {
            conflict_type = ConflictType::TrueConflict;
        }

        let (resolution, needs_review) = match conflict_type {
            ConflictType::SameChange => (Resolution::both(), false),
            ConflictType::Input1Only => (Resolution::only(Side::Input1), false),
            ConflictType::Input2Only => (Resolution::only(Side::Input2), false),
            ConflictType::TrueConflict => (Resolution::only(Side::Input2), true),
        };

        let pointers = SidePointers {
            base: base.as_ref().map(|(pointer, _)| pointer.clone()),
            input1: input1.as_ref().map(|(pointer, _)| pointer.clone()),
            input2: input2.as_ref().map(|(pointer, _)| pointer.clone()),
        };
        let path = match &group.location {
            Location::Scalar { path } | Location::UnionObject { path } => path.clone(),
            Location::ArrayItem { array, .. } => pointers
                .base
                .clone()
                .or_else(|| pointers.input2.clone())
                .or_else(|| pointers.input1.clone())
                .unwrap_or_else(|| array.clone()),
        };

        Some(ConflictRecord {
            id: String::new(),
            path,
            location: group.location,
            base_value: base_value.cloned(),
            input1_value: input1_value.cloned(),
            input2_value: input2_value.cloned(),
            conflict_type,
            edits_from_input1: group.input1_edits,
            edits_from_input2: group.input2_edits,
            resolution,
            needs_review,
            variant_switch,
            pointers,
        })
    }

    /// Structural lookup of a group's owner in one document.
    fn locate(&self, side: Side, group: &Group) -> Option<(Pointer, &'d Node)> {
        let doc = self.get(side)?;
        match &group.location {
            Location::Scalar { path } | Location::UnionObject { path } => {
                doc.get(path).map(|value| (path.clone(), value))
            }
            Location::ArrayItem { array, anchor } => {
                let (position, item) = find_item(doc.get(array)?, &group.fields, anchor)?;
                Some((array.index(position), item))
            }
        }
    }

    fn outcome(
        &self,
        base: Option<&Node>,
        input1: Option<&Node>,
        input2: Option<&Node>,
    ) -> Option<ConflictType> {
        if self.base.is_none() {
            return match (input1, input2) {
                (Some(_), None) => Some(ConflictType::Input1Only),
                (None, Some(_)) => Some(ConflictType::Input2Only),
                (Some(left), Some(right)) if !optional_equal(Some(left), Some(right)) => {
                    Some(ConflictType::TrueConflict)
                }
                _ => None,
            };
        }

        let first = !optional_equal(base, input1);
        let second = match self.mode {
            CompareMode::Split => !optional_equal(base, input2),
            CompareMode::Sequential => !optional_equal(input1, input2),
        };
        match (first, second) {
            (false, false) => None,
            (true, false) => Some(ConflictType::Input1Only),
            (false, true) => Some(ConflictType::Input2Only),
            (true, true) if self.mode == CompareMode::Split && optional_equal(input1, input2) => {
                Some(ConflictType::SameChange)
            }
            (true, true) => Some(ConflictType::TrueConflict),
        }
    }
}
