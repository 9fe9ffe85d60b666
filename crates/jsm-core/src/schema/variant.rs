use crate::compare::deep_equal;
use crate::Node;

use super::Schema;

/// A candidate selected by [`resolve_variant`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VariantMatch<'s> {
    /// Position of the candidate in the combinator's list.
    pub index: usize,
    /// The candidate itself.
    pub schema: &'s Schema,
}

impl<'s> VariantMatch<'s> {
    fn new(index: usize, schema: &'s Schema) -> Self {
        Self { index, schema }
    }
}

/// Selects the candidate schema describing `value`.
///
/// Rules are tried in order and the first hit wins:
/// 1. `null` picks a candidate whose constant is `null`;
/// 2. objects are matched by a discriminator field, the first property in
///    declaration order that carries a constant in some candidate and is
///    present on the value;
/// 3. objects pick the first candidate whose required members are present and
///    whose constant members all match;
/// 4. a candidate whose constant equals the value;
/// 5. a candidate whose declared type matches the value's runtime type;
/// 6. the first candidate.
///
/// Returns `None` only for an empty candidate list.
///
/// ```
/// # use jsm_core::{schema::resolve_variant, Node, Schema};
/// let schema = Schema::from_json_str(r#"{"oneOf":[
///     {"properties":{"type":{"const":"card"}}},
///     {"properties":{"type":{"const":"cash"}}}
/// ]}"#)?;
/// let value = Node::from_json_str(r#"{"type":"cash","amount":5}"#)?;
/// let found = resolve_variant(&value, schema.variants().unwrap()).unwrap();
/// assert_eq!(found.index, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn resolve_variant<'s>(value: &Node, candidates: &'s [Schema]) -> Option<VariantMatch<'s>> {
    if candidates.is_empty() {
        return None;
    }

    if matches!(value, Node::Null) {
        if let Some(found) = find(candidates, |c| c.body().constant() == Some(&Node::Null)) {
            return Some(found);
        }
    }

    if let Node::Object(members) = value {
        if let Some(field) = discriminator_field(members, candidates) {
            let actual = &members[field];
            let by_discriminator = find(candidates, |c| {
                c.const_properties()
                    .into_iter()
                    .any(|(name, constant)| name == field && deep_equal(constant, actual))
            });
            if let Some(found) = by_discriminator {
                return Some(found);
            }
        }

        let by_shape = find(candidates, |c| {
            c.body().required.iter().all(|name| members.contains_key(name))
                && c.const_properties().into_iter().all(|(name, constant)| {
                    members.get(name).is_some_and(|v| deep_equal(v, constant))
                })
        });
        if let Some(found) = by_shape {
            return Some(found);
        }
    }

    let by_constant =
        find(candidates, |c| c.body().constant().is_some_and(|k| deep_equal(k, value)));
    if let Some(found) = by_constant {
        return Some(found);
    }

    if let Some(found) = find(candidates, |c| c.body().types.iter().any(|t| t.matches(value))) {
        return Some(found);
    }

    Some(VariantMatch::new(0, &candidates[0]))
}

fn find<'s, P>(candidates: &'s [Schema], predicate: P) -> Option<VariantMatch<'s>>
where
    P: Fn(&Schema) -> bool,
{
    candidates
        .iter()
        .enumerate()
        .find(|(_, candidate)| predicate(*candidate))
        .map(|(index, candidate)| VariantMatch::new(index, candidate))
}

fn discriminator_field<'v>(
    members: &'v std::collections::BTreeMap<String, Node>,
    candidates: &[Schema],
) -> Option<&'v str> {
    candidates
        .iter()
        .flat_map(Schema::const_properties)
        .find_map(|(name, _)| members.get_key_value(name).map(|(key, _)| key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(text: &str) -> Vec<Schema> {
        Schema::from_json_str(text).unwrap().variants().unwrap().to_vec()
    }

    fn node(text: &str) -> Node {
        Node::from_json_str(text).unwrap()
    }

    fn payment_variants() -> Vec<Schema> {
        candidates(
            r#"{"oneOf":[
                {"type":"object","required":["type","number"],"properties":{"type":{"const":"card"},"number":{"type":"string"}}},
                {"type":"object","required":["type","currency","address"],"properties":{"type":{"const":"crypto"},"currency":{"type":"string"},"address":{"type":"string"}}},
                {"type":"object","required":["type","amount"],"properties":{"type":{"const":"cash"},"amount":{"type":"number"},"currency":{"type":"string"}}}
            ]}"#,
        )
    }

    #[test]
    fn discriminator_selects_variant() {
        let variants = payment_variants();
        let crypto = node(r#"{"type":"crypto","currency":"BTC","address":"a"}"#);
        assert_eq!(resolve_variant(&crypto, &variants).unwrap().index, 1);
        let cash = node(r#"{"type":"cash","amount":1000,"currency":"USD"}"#);
        assert_eq!(resolve_variant(&cash, &variants).unwrap().index, 2);
    }

    #[test]
    fn unknown_discriminator_falls_through_to_shape() {
        let variants = candidates(
            r#"{"oneOf":[
                {"required":["a"],"properties":{"kind":{"const":"x"}}},
                {"required":["b"]}
            ]}"#,
        );
        let value = node(r#"{"kind":"y","b":1}"#);
        assert_eq!(resolve_variant(&value, &variants).unwrap().index, 1);
    }

    #[test]
    fn null_prefers_null_constant() {
        let variants = candidates(r#"{"anyOf":[{"type":"string"},{"const":null}]}"#);
        assert_eq!(resolve_variant(&Node::Null, &variants).unwrap().index, 1);
    }

    #[test]
    fn scalar_constants_and_types() {
        let variants =
            candidates(r#"{"oneOf":[{"type":"number"},{"const":"auto"},{"type":"string"}]}"#);
        assert_eq!(resolve_variant(&node("\"auto\""), &variants).unwrap().index, 1);
        assert_eq!(resolve_variant(&node("\"other\""), &variants).unwrap().index, 2);
        assert_eq!(resolve_variant(&node("3"), &variants).unwrap().index, 0);
    }

    #[test]
    fn falls_back_to_first_candidate() {
        let variants = candidates(r#"{"oneOf":[{"type":"string"},{"type":"number"}]}"#);
        assert_eq!(resolve_variant(&node("[1]"), &variants).unwrap().index, 0);
        assert!(resolve_variant(&node("1"), &[]).is_none());
    }

    #[test]
    fn discriminator_uses_declaration_order() {
        let variants = candidates(
            r#"{"oneOf":[
                {"properties":{"mode":{"const":"m1"},"kind":{"const":"k1"}}},
                {"properties":{"mode":{"const":"m2"},"kind":{"const":"k2"}}}
            ]}"#,
        );
        // `mode` is declared first, so it decides even though `kind` points elsewhere.
        let value = node(r#"{"kind":"k1","mode":"m2"}"#);
        assert_eq!(resolve_variant(&value, &variants).unwrap().index, 1);
    }
}
