use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while canonicalizing external data into [`Node`](crate::Node).
#[derive(Debug, Error)]
pub enum CanonicalizeError {
    /// The provided JSON input was invalid.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The provided YAML input was invalid.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The input contained nothing but whitespace.
    #[error("document is empty")]
    Empty,
    /// Encountered a number that cannot be represented as an IEEE-754 f64.
    #[error("number {value} cannot be represented as f64")]
    NumberOutOfRange {
        /// The textual representation of the offending number.
        value: String,
    },
    /// YAML maps may only contain string keys.
    #[error("unsupported YAML key type: {found}")]
    NonStringYamlKey {
        /// A description of the key that triggered the error.
        found: String,
    },
    /// YAML tags have no JSON counterpart.
    #[error("unsupported YAML tag: {tag}")]
    UnsupportedYamlTag {
        /// The tag identifier encountered in the document.
        tag: String,
    },
    /// Attempted to construct a [`Number`](crate::Number) that is not finite.
    #[error("non-finite number encountered: {value}")]
    NotFinite {
        /// The offending numeric value.
        value: f64,
    },
}

/// Names the document an error or value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentRole {
    /// The common ancestor.
    Base,
    /// The first modified copy ("theirs").
    Input1,
    /// The second modified copy ("ours").
    Input2,
    /// The JSON Schema guiding the comparison.
    Schema,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Input1 => f.write_str("input1"),
            Self::Input2 => f.write_str("input2"),
            Self::Schema => f.write_str("schema"),
        }
    }
}

/// Fatal errors returned by the engine entry points.
///
/// Everything that is not listed here is recovered locally and reported as a
/// warning or issue instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// One of the documents could not be parsed.
    #[error("failed to parse {role}: {source}")]
    Parse {
        /// Which document failed.
        role: DocumentRole,
        /// The underlying parse failure.
        #[source]
        source: CanonicalizeError,
    },
    /// The schema document could not be parsed.
    #[error("failed to load schema: {0}")]
    Schema(#[from] SchemaError),
}

impl EngineError {
    pub(crate) fn parse(role: DocumentRole, source: CanonicalizeError) -> Self {
        Self::Parse { role, source }
    }
}

/// Errors emitted while loading a JSON Schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema text was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The schema text was not valid YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The root of the schema must be an object or a boolean.
    #[error("schema root must be an object or boolean, found {found}")]
    InvalidRoot {
        /// JSON type name of the offending root.
        found: &'static str,
    },
}

/// Errors emitted when constructing [`DetectOptions`](crate::DetectOptions).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// A zero budget would warn on every single computation.
    #[error("performance budget must be greater than zero")]
    ZeroBudget,
    /// Mode names accepted by [`CompareMode::from_str`](std::str::FromStr).
    #[error("unknown compare mode `{0}`: expected `split` or `sequential`")]
    UnknownMode(String),
}

/// Errors produced while parsing JSON Pointer text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointerError {
    /// Non-empty pointers must start with `/`.
    #[error("JSON pointer `{0}` must be empty or start with '/'")]
    MissingLeadingSlash(String),
    /// `~` must be followed by `0` or `1`.
    #[error("invalid escape sequence in JSON pointer `{0}`")]
    InvalidEscape(String),
}

/// Failure to write a value into the merge result at a given location.
///
/// These are recovered by the merge builder and surfaced as warnings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// An intermediate container along the path does not exist.
    #[error("path {path} does not resolve in the merge result")]
    Unresolved {
        /// The pointer that failed to resolve.
        path: String,
    },
    /// A container of the wrong kind was found along the path.
    #[error("found {found} at {path}: expected {expected}")]
    TypeMismatch {
        /// The pointer of the offending container.
        path: String,
        /// The container kind the path required.
        expected: &'static str,
        /// The JSON type that was found instead.
        found: &'static str,
    },
    /// An array index beyond the end of the array.
    #[error("index {index} out of bounds at {path}")]
    OutOfBounds {
        /// The pointer of the array.
        path: String,
        /// The offending index.
        index: usize,
    },
    /// The root of the document cannot be removed.
    #[error("cannot remove the document root")]
    RootRemoval,
}

/// Reasons a smart merge of two values was refused.
///
/// A refusal is an expected outcome: the merge builder falls back to input2.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmartMergeError {
    /// Arrays are never merged element-wise.
    #[error("merge failed at {path}: arrays cannot be merged")]
    Array {
        /// Location of the arrays.
        path: String,
    },
    /// One side removed the value the other side changed.
    #[error("merge failed at {path}: one side removed the value")]
    Missing {
        /// Location of the value.
        path: String,
    },
    /// Two different non-container values.
    #[error("merge failed at {path}: both sides set different values")]
    Scalar {
        /// Location of the values.
        path: String,
    },
    /// The schema forbids the extra member.
    #[error("merge failed at {path}: additional property is not allowed")]
    AdditionalDenied {
        /// Location of the member.
        path: String,
    },
    /// The extra member does not satisfy `additionalProperties`.
    #[error("merge failed at {path}: {reason}")]
    AdditionalInvalid {
        /// Location of the member.
        path: String,
        /// First validation failure.
        reason: String,
    },
}
