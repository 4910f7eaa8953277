//! # Document Model
//!
//! Plain data shared by the incremental analysis engine, its event bus and its front ends.
//!
//! This crate provides:
//! - [`AnalysisScope`]: a named, line-ranged span of a document together with its hash,
//!   declared dependencies/exports and the issues last computed for it
//! - [`ChangeRegion`]: one line-level edit between two versions of a document
//! - [`DocumentState`]: the last known analysis state of a document
//! - [`IncrementalAnalysisResult`]: the outcome of one analysis pass
//!
//! Issues are opaque to the engine and are carried as raw JSON values.

pub mod change;
pub mod document;
pub mod hash;
pub mod result;
pub mod scope;

pub use change::{ChangeKind, ChangeRegion};
pub use document::DocumentState;
pub use hash::content_hash;
pub use result::{Coverage, IncrementalAnalysisResult};
pub use scope::{AnalysisScope, ScopeKind};

/// An analyzer-defined finding. The engine never looks inside it.
pub type Issue = serde_json::Value;
