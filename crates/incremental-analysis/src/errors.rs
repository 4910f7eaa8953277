//! Error types for the incremental-analysis crate

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A language pattern table contains an invalid regular expression
    #[error("Invalid scope pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A later debounced request for the same document replaced this one
    #[error("Debounced analysis of {uri} was superseded by a newer request")]
    Superseded { uri: String },

    /// The pending debounced request was discarded before it ran
    #[error("Debounced analysis of {uri} was cancelled")]
    Cancelled { uri: String },

    /// The external analyzer failed for one scope
    #[error("Analyzer failed for scope {scope}: {message}")]
    Analyzer { scope: String, message: String },

    /// The external analyzer exceeded the configured timeout for one scope
    #[error("Analyzer timed out after {timeout_ms}ms for scope {scope}")]
    Timeout { scope: String, timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
