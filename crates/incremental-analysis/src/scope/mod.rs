//! Scope detection.
//!
//! Splits a document into named, line-ranged scopes (file, module, class, function,
//! block) using per-language pattern tables. See [`ScopeDetector::detect`].

pub mod detector;
pub mod languages;


pub use detector::{ANONYMOUS_SCOPE, FILE_SCOPE, ScopeDetector};
pub use languages::{BlockStyle, LanguageSpec};
