//! Schema-aware conflict detection and merging for JSON documents.
//!
//! `jsm-core` compares two modified copies of a document, optionally against
//! their common ancestor, and reports every semantic location where they
//! changed. A JSON Schema, when supplied, sharpens the comparison: array
//! items are matched by anchor fields instead of position and discriminated
//! unions that switch variant are reported as a single conflict. Resolved
//! conflicts are then turned back into a merged document.
//!
//! ```
//! use jsm_core::{conflict::ConflictType, engine::{DocumentFormat, Documents}, DetectOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let docs = Documents::parse(
//!         DocumentFormat::Json,
//!         Some(r#"{"name":"svc","port":80}"#),
//!         r#"{"name":"svc","port":8080}"#,
//!         r#"{"name":"api","port":80}"#,
//!         None,
//!     )?;
//!     let options = DetectOptions::default();
//!     let conflicts = docs.detect(&options);
//!     assert_eq!(conflicts.len(), 2);
//!     assert_eq!(conflicts[0].conflict_type, ConflictType::Input2Only);
//!     assert_eq!(conflicts[1].conflict_type, ConflictType::Input1Only);
//!
//!     let outcome = docs.merge(&conflicts, &options);
//!     assert!(outcome.is_valid);
//!     assert!(outcome.content.contains("\"api\""));
//!     assert!(outcome.content.contains("8080"));
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anchor;
pub mod compare;
pub mod conflict;
pub mod diff;
pub mod engine;
mod error;
pub mod locate;
pub mod merge;
mod node;
mod number;
mod options;
mod pointer;
pub mod schema;

pub use conflict::{
    apply_decisions, detect_conflicts, render_conflicts, ConflictRecord, ConflictType, Decision,
    Location, Resolution, ResolutionState, Side, SidePointers,
};
pub use engine::{DocumentFormat, Documents};
pub use error::{
    ApplyError, CanonicalizeError, DocumentRole, EngineError, OptionsError, PointerError,
    SchemaError, SmartMergeError,
};
pub use locate::{line_range, LineRange};
pub use merge::{build_merge, Issue, MergeOutcome, Severity};
pub use node::Node;
pub use number::Number;
pub use options::{CompareMode, DetectOptions};
pub use pointer::{Pointer, Segment};
pub use schema::Schema;

/// Returns the semantic version of the `jsm-core` crate.
///
/// ```
/// assert!(!jsm_core::version().is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
