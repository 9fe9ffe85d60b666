//! Text-level entry points.
//!
//! [`Documents`] parses the raw inputs of one comparison once and then serves
//! any number of detection and merge calls over them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conflict::{detect_conflicts, ConflictRecord};
use crate::merge::{build_merge, MergeOutcome};
use crate::{CanonicalizeError, DetectOptions, DocumentRole, EngineError, Node, Schema};

/// Text format of the documents and the schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// JSON text.
    #[default]
    Json,
    /// YAML text. Only the JSON-compatible subset is accepted.
    Yaml,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown document format `{other}`")),
        }
    }
}

impl DocumentFormat {
    fn parse(self, input: &str) -> Result<Node, CanonicalizeError> {
        match self {
            Self::Json => Node::from_json_str(input),
            Self::Yaml => Node::from_yaml_str(input),
        }
    }
}

/// The parsed inputs of one comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct Documents {
    /// Common ancestor; `None` selects two-way comparison.
    pub base: Option<Node>,
    /// First modified copy.
    pub input1: Node,
    /// Second modified copy.
    pub input2: Node,
    /// Optional guiding schema.
    pub schema: Option<Schema>,
}

impl Documents {
    /// Parses every document. A blank base counts as absent.
    ///
    /// ```
    /// # use jsm_core::{engine::{DocumentFormat, Documents}, DetectOptions};
    /// let docs = Documents::parse(DocumentFormat::Json, Some("  "), r#"{"a":1}"#, r#"{"a":2}"#, None)?;
    /// assert!(docs.base.is_none());
    /// let conflicts = docs.detect(&DetectOptions::default());
    /// assert_eq!(conflicts.len(), 1);
    /// # Ok::<(), jsm_core::EngineError>(())
    /// ```
    pub fn parse(
        format: DocumentFormat,
        base: Option<&str>,
        input1: &str,
        input2: &str,
        schema: Option<&str>,
    ) -> Result<Self, EngineError> {
        let parse =
            |text: &str, role| format.parse(text).map_err(|err| EngineError::parse(role, err));
        let base = match base.filter(|text| !text.trim().is_empty()) {
            Some(text) => Some(parse(text, DocumentRole::Base)?),
            None => None,
        };
        let input1 = parse(input1, DocumentRole::Input1)?;
        let input2 = parse(input2, DocumentRole::Input2)?;
        let schema = match schema.filter(|text| !text.trim().is_empty()) {
            Some(text) => Some(match format {
                DocumentFormat::Json => Schema::from_json_str(text)?,
                DocumentFormat::Yaml => Schema::from_yaml_str(text)?,
            }),
            None => None,
        };
        Ok(Self { base, input1, input2, schema })
    }

    /// Runs conflict detection.
    #[must_use]
    pub fn detect(&self, options: &DetectOptions) -> Vec<ConflictRecord> {
        detect_conflicts(
            self.base.as_ref(),
            &self.input1,
            &self.input2,
            self.schema.as_ref(),
            options,
        )
    }

    /// Builds the merged document for resolved conflicts.
    #[must_use]
    pub fn merge(&self, conflicts: &[ConflictRecord], options: &DetectOptions) -> MergeOutcome {
        build_merge(
            self.base.as_ref(),
            &self.input1,
            &self.input2,
            conflicts,
            self.schema.as_ref(),
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_name_the_document() {
        let err = Documents::parse(DocumentFormat::Json, Some("{}"), "{", "{}", None).unwrap_err();
        assert!(matches!(err, EngineError::Parse { role: DocumentRole::Input1, .. }));
        assert!(err.to_string().starts_with("failed to parse input1"));

        let err =
            Documents::parse(DocumentFormat::Json, Some("[1,"), "{}", "{}", None).unwrap_err();
        assert!(matches!(err, EngineError::Parse { role: DocumentRole::Base, .. }));

        let err = Documents::parse(DocumentFormat::Json, None, "{}", "", None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Parse { role: DocumentRole::Input2, source: CanonicalizeError::Empty }
        ));
    }

    #[test]
    fn invalid_schema_is_fatal() {
        let err = Documents::parse(DocumentFormat::Json, None, "{}", "{}", Some("[]")).unwrap_err();
        assert!(matches!(err, EngineError::Schema(_)));
    }

    #[test]
    fn yaml_inputs_parse() {
        let docs = Documents::parse(
            DocumentFormat::Yaml,
            Some("name: a\n"),
            "name: b\n",
            "name: a\nextra: true\n",
            Some("properties:\n  name:\n    type: string\n"),
        )
        .unwrap();
        assert!(docs.schema.is_some());
        let conflicts = docs.detect(&DetectOptions::default());
        assert_eq!(conflicts.len(), 2);
        let outcome = docs.merge(&conflicts, &DetectOptions::default());
        let expected = Node::from_json_str(r#"{"name":"b","extra":true}"#).unwrap();
        assert_eq!(outcome.document, Some(expected));
    }

    #[test]
    fn formats_parse_from_names() {
        assert_eq!("YML".parse::<DocumentFormat>(), Ok(DocumentFormat::Yaml));
        assert_eq!("json".parse::<DocumentFormat>(), Ok(DocumentFormat::Json));
        assert!("toml".parse::<DocumentFormat>().is_err());
    }
}
