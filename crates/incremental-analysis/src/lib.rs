//! # Incremental Analysis
//!
//! Re-analyses a document as it is edited, sending only the scopes that changed (or whose
//! dependencies changed) to an external [`ScopeAnalyzer`] and reusing the issues of every
//! other scope.
//!
//! ```text
//! (uri, content, language, version)
//!        │
//!        ▼
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐
//! │  Debounce    │──▶│  Incremental  │──▶│  ScopeAnalyzer   │
//! │  Scheduler   │   │  Analyzer     │   │  (per language)  │
//! └──────────────┘   └───────┬───────┘   └──────────────────┘
//!                            │
//!          ┌─────────────────┼──────────────────┐
//!          ▼                 ▼                  ▼
//!   ┌─────────────┐   ┌─────────────┐   ┌────────────────┐
//!   │   Scope     │   │   Change    │   │ Document State │
//!   │  Detector   │   │  Detector   │   │   Cache (LRU)  │
//!   └─────────────┘   └─────────────┘   └────────────────┘
//! ```
//!
//! [`AnalysisEngine`] wires the pieces together and publishes lifecycle events on an
//! [`event_bus::EventBus`].

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod diff;
pub mod engine;
pub mod errors;
pub mod scope;

pub use analyzer::{IncrementalAnalyzer, ScopeAnalyzer, canonical_fingerprint};
pub use cache::DocumentStateCache;
pub use config::{EngineConfig, read_engine_configuration};
pub use debounce::{DebounceScheduler, DebouncedAnalysis};
pub use diff::diff;
pub use engine::{AnalysisEngine, EngineStatistics};
pub use errors::{EngineError, Result};
pub use scope::{BlockStyle, LanguageSpec, ScopeDetector};
