//! Identity of array items across document versions.
//!
//! An item schema names the fields that identify an item ("anchor fields").
//! Items carrying the same anchor key in two versions are the same logical
//! item, wherever they sit in the array.

use std::collections::BTreeMap;

use crate::{Node, Schema};

const ID_LIKE: [&str; 4] = ["id", "uuid", "_id", "key"];
const ID_FORMATS: [&str; 2] = ["uuid", "objectid"];

/// Computes the anchor fields declared by an array item schema.
///
/// Constant-valued properties always take part, since they discriminate the
/// item's variant. They are combined with the first of these tiers that the
/// schema declares: `uuid`/`objectid` formatted properties, the names `id`,
/// `uuid`, `_id`, `key`, then `type`, then `name`. Union item schemas
/// contribute the properties of all their variants.
///
/// ```
/// # use jsm_core::{anchor::anchor_fields, Schema};
/// let item = Schema::from_json_str(r#"{"properties":{"kind":{"const":"user"},"name":{},"id":{}}}"#)?;
/// assert_eq!(anchor_fields(&item), vec!["kind".to_string(), "id".to_string()]);
/// # Ok::<(), jsm_core::SchemaError>(())
/// ```
#[must_use]
pub fn anchor_fields(item_schema: &Schema) -> Vec<String> {
    let mut declared: Vec<(&str, &Schema)> = Vec::new();
    let variants = item_schema.variants().unwrap_or_default();
    for source in std::iter::once(item_schema).chain(variants) {
        for (name, property) in &source.body().properties {
            if !declared.iter().any(|(known, _)| *known == name.as_str()) {
                declared.push((name.as_str(), property));
            }
        }
    }

    let is_constant = |property: &Schema| property.body().constant().is_some();
    let mut fields: Vec<String> = declared
        .iter()
        .filter(|(_, property)| is_constant(*property))
        .map(|(name, _)| (*name).to_string())
        .collect();

    let tiers: [&dyn Fn(&str, &Schema) -> bool; 4] = [
        &|_: &str, property: &Schema| {
            property
                .body()
                .format
                .as_deref()
                .is_some_and(|format| ID_FORMATS.iter().any(|id| format.eq_ignore_ascii_case(id)))
        },
        &|name: &str, _: &Schema| ID_LIKE.contains(&name),
        &|name: &str, _: &Schema| name == "type",
        &|name: &str, _: &Schema| name == "name",
    ];
    for tier in tiers {
        let found: Vec<String> = declared
            .iter()
            .filter(|(name, property)| !is_constant(*property) && tier(*name, *property))
            .map(|(name, _)| (*name).to_string())
            .collect();
        if !found.is_empty() {
            fields.extend(found);
            break;
        }
    }
    fields
}

/// Builds the anchor key of one item, or `None` when it carries none of the
/// anchor fields.
///
/// Values are rendered as compact JSON, so `"1"` and `1` give different keys
/// and a `|` inside a string cannot fake a field separator.
///
/// ```
/// # use jsm_core::{anchor::anchor_key, Node};
/// let item = Node::from_json_str(r#"{"id":7,"kind":"user","extra":true}"#)?;
/// let fields = vec!["kind".to_string(), "id".to_string()];
/// assert_eq!(anchor_key(&item, &fields).as_deref(), Some(r#"kind:"user"|id:7"#));
/// assert_eq!(anchor_key(&Node::from_json_str("3")?, &fields), None);
/// # Ok::<(), jsm_core::CanonicalizeError>(())
/// ```
#[must_use]
pub fn anchor_key(item: &Node, fields: &[String]) -> Option<String> {
    let members = item.as_object()?;
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|field| {
            members.get(field).map(|value| format!("{field}:{}", value.to_compact_string()))
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

/// Anchor keys of every item of one array.
///
/// Repeated keys are disambiguated by occurrence: the second item keyed
/// `id:1` becomes `id:1@2`, so duplicates still pair up in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnchorIndex {
    keys: Vec<Option<String>>,
    positions: BTreeMap<String, usize>,
}

impl AnchorIndex {
    /// Indexes `items` by their anchor keys.
    ///
    /// ```
    /// # use jsm_core::{anchor::AnchorIndex, Node};
    /// let items = Node::from_json_str(r#"[{"id":1},{"id":2},{"id":1},{"x":0}]"#)?;
    /// let index = AnchorIndex::build(items.as_array().unwrap(), &["id".to_string()]);
    /// assert_eq!(index.position("id:2"), Some(1));
    /// assert_eq!(index.key_at(2), Some("id:1@2"));
    /// assert_eq!(index.key_at(3), None);
    /// # Ok::<(), jsm_core::CanonicalizeError>(())
    /// ```
    #[must_use]
    pub fn build(items: &[Node], fields: &[String]) -> Self {
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut positions = BTreeMap::new();
        let keys = items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                let base = anchor_key(item, fields)?;
                let occurrence = seen.entry(base.clone()).or_insert(0);
                *occurrence += 1;
                let key = if *occurrence == 1 { base } else { format!("{base}@{occurrence}") };
                positions.insert(key.clone(), position);
                Some(key)
            })
            .collect();
        Self { keys, positions }
    }

    /// Key of the item at `position`.
    #[must_use]
    pub fn key_at(&self, position: usize) -> Option<&str> {
        self.keys.get(position)?.as_deref()
    }

    /// Position of the item carrying `key`.
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Whether no item yielded a key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Finds the item carrying `key` in an array node.
#[must_use]
pub fn find_item<'a>(array: &'a Node, fields: &[String], key: &str) -> Option<(usize, &'a Node)> {
    let items = array.as_array()?;
    let position = AnchorIndex::build(items, fields).position(key)?;
    Some((position, &items[position]))
}
