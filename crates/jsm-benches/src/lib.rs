//! Synthetic corpora for benchmarking the `jsm` conflict engine.
//!
//! Every corpus is generated in memory, sized like the documents the engine
//! is tuned for (hundreds of properties and array items), so benches need no
//! fixture files.
//!
//! # Examples
//!
//! ```
//! use jsm_core::DetectOptions;
//!
//! let corpus = jsm_benches::available_corpora()
//!     .into_iter()
//!     .find(|c| c.name() == "config")
//!     .unwrap();
//! let dataset = corpus.load().unwrap();
//! assert!(!dataset.detect(&DetectOptions::default()).is_empty());
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use jsm_core::{ConflictRecord, DetectOptions, Documents, EngineError, MergeOutcome, Node, Schema};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

/// A named generator of three-way inputs.
#[derive(Clone, Copy, Debug)]
pub struct Corpus {
    name: &'static str,
    build: fn() -> Generated,
}

struct Generated {
    base: JsonValue,
    input1: JsonValue,
    input2: JsonValue,
    schema: Option<JsonValue>,
}

impl Corpus {
    /// Short identifier used as the benchmark id.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Generates the documents.
    pub fn load(&self) -> Result<Dataset, EngineError> {
        let generated = (self.build)();
        let node = |value: JsonValue, role| {
            Node::from_json_value(value).map_err(|err| EngineError::Parse { role, source: err })
        };
        let documents = Documents {
            base: Some(node(generated.base, jsm_core::DocumentRole::Base)?),
            input1: node(generated.input1, jsm_core::DocumentRole::Input1)?,
            input2: node(generated.input2, jsm_core::DocumentRole::Input2)?,
            schema: generated.schema.as_ref().map(Schema::from_root).transpose()?,
        };
        let pretty = documents.input1.to_pretty_string();
        Ok(Dataset { documents, pretty })
    }
}

/// Loaded inputs of one corpus.
#[derive(Clone, Debug)]
pub struct Dataset {
    documents: Documents,
    pretty: String,
}

impl Dataset {
    /// The parsed documents.
    #[must_use]
    pub fn documents(&self) -> &Documents {
        &self.documents
    }

    /// Pretty-printed input1, the text line ranges are computed on.
    #[must_use]
    pub fn input1_text(&self) -> &str {
        &self.pretty
    }

    /// Runs conflict detection.
    #[must_use]
    pub fn detect(&self, options: &DetectOptions) -> Vec<ConflictRecord> {
        self.documents.detect(options)
    }

    /// Builds the merge for already detected conflicts.
    #[must_use]
    pub fn merge(&self, conflicts: &[ConflictRecord], options: &DetectOptions) -> MergeOutcome {
        self.documents.merge(conflicts, options)
    }
}

/// Every registered corpus.
#[must_use]
pub fn available_corpora() -> Vec<Corpus> {
    vec![
        Corpus { name: "config", build: config_corpus },
        Corpus { name: "anchored-list", build: anchored_list_corpus },
        Corpus { name: "union-payments", build: union_corpus },
    ]
}

/// A wide nested settings object with scattered edits on both sides.
fn config_corpus() -> Generated {
    let section = |s: usize, bump: usize| {
        let mut members = JsonMap::new();
        for k in 0..20 {
            let value = if (k + s) % 7 == bump { json!(k * 10 + 1) } else { json!(k * 10) };
            members.insert(format!("key{k}"), value);
        }
        JsonValue::Object(members)
    };
    let document = |bump: usize| {
        let mut sections = JsonMap::new();
        for s in 0..15 {
            sections.insert(format!("section{s}"), section(s, bump));
        }
        JsonValue::Object(sections)
    };
    Generated { base: document(usize::MAX), input1: document(0), input2: document(3), schema: None }
}

/// Identified records, reordered in input1 and edited in input2.
fn anchored_list_corpus() -> Generated {
    let record = |id: usize, status: &str| {
        json!({ "id": format!("r{id}"), "status": status, "weight": id })
    };
    let base: Vec<_> = (0..300).map(|id| record(id, "open")).collect();
    let mut input1 = base.clone();
    input1.reverse();
    if let Some(first) = input1.first_mut() {
        *first = record(299, "closed");
    }
    let input2: Vec<_> = (0..300)
        .map(|id| record(id, if id % 25 == 0 { "blocked" } else { "open" }))
        .chain([record(300, "new")])
        .collect();
    let schema = json!({
        "type": "object",
        "properties": {
            "records": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "id": { "type": "string" }, "status": {}, "weight": {} }
                }
            }
        }
    });
    Generated {
        base: json!({ "records": base }),
        input1: json!({ "records": input1 }),
        input2: json!({ "records": input2 }),
        schema: Some(schema),
    }
}

/// Many discriminated unions, some switching variant on both sides.
fn union_corpus() -> Generated {
    let card = |n: usize| json!({ "type": "card", "number": format!("{n:04}") });
    let cash = |n: usize| json!({ "type": "cash", "amount": n, "currency": "USD" });
    let crypto =
        |n: usize| json!({ "type": "crypto", "currency": "BTC", "address": format!("addr{n}") });
    let build = |pick: &dyn Fn(usize) -> JsonValue| {
        let payments: JsonMap<String, JsonValue> =
            (0..150).map(|n| (format!("p{n}"), pick(n))).collect();
        JsonValue::Object(payments)
    };
    let variant = json!({
        "oneOf": [
            { "type": "object", "properties": { "type": { "const": "card" }, "number": {} } },
            {
                "type": "object",
                "properties": { "type": { "const": "cash" }, "amount": {}, "currency": {} }
            },
            {
                "type": "object",
                "properties": { "type": { "const": "crypto" }, "currency": {}, "address": {} }
            }
        ]
    });
    Generated {
        base: build(&|n| card(n)),
        input1: build(&|n| if n % 3 == 0 { crypto(n) } else { card(n) }),
        input2: build(&|n| if n % 2 == 0 { cash(n) } else { card(n) }),
        schema: Some(json!({ "type": "object", "additionalProperties": variant })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsm_core::{ConflictType, Location};

    #[test]
    fn every_corpus_loads_and_conflicts() {
        let options = DetectOptions::default();
        for corpus in available_corpora() {
            let dataset = corpus.load().expect("corpus loads");
            let conflicts = dataset.detect(&options);
            assert!(!conflicts.is_empty(), "{} produced no conflicts", corpus.name());
            assert!(dataset.merge(&conflicts, &options).is_valid);
        }
    }

    #[test]
    fn anchored_list_ignores_reordering() {
        let dataset = available_corpora()[1].load().unwrap();
        let conflicts = dataset.detect(&DetectOptions::default());
        assert!(conflicts
            .iter()
            .all(|conflict| matches!(conflict.location, Location::ArrayItem { .. })));
        // 12 blocked records, the appended one and the closed one
        assert_eq!(conflicts.len(), 14);
    }

    #[test]
    fn union_switches_are_true_conflicts() {
        let dataset = available_corpora()[2].load().unwrap();
        let conflicts = dataset.detect(&DetectOptions::default());
        // every payment that left the card variant on either side
        assert_eq!(conflicts.len(), 100);
        assert!(conflicts.iter().all(|conflict| {
            conflict.variant_switch && conflict.conflict_type == ConflictType::TrueConflict
        }));
    }
}
