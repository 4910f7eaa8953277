use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::errors::Result;

pub const DEFAULT_MAX_CACHED_DOCUMENTS: usize = 100;
pub const DEFAULT_MAX_SCOPE_SIZE: usize = 500;
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 300;
pub const DEFAULT_SCOPE_EXPANSION_LINES: usize = 5;
pub const DEFAULT_SCOPE_MATCH_TOLERANCE: usize = 5;
pub const DEFAULT_MIN_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Engine options. Keys are camelCase on disk and every field falls back to its default.
///
/// `max_scope_size`, `min_confidence_threshold` and `enable_cross_file_analysis` are
/// accepted but advisory: the engine does not act on them. `analysis_timeout_ms` is only
/// enforced when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub max_cached_documents: usize,
    pub max_scope_size: usize,
    pub debounce_delay_ms: u64,
    pub scope_expansion_lines: usize,
    pub enable_dependency_tracking: bool,
    pub transitive_dependency_tracking: bool,
    pub enable_cross_file_analysis: bool,
    pub min_confidence_threshold: f64,
    pub analysis_timeout_ms: Option<u64>,
    /// How far apart (in lines) a scope may move between versions and still be
    /// recognised as the same scope.
    pub scope_match_tolerance: usize,
}

impl EngineConfig {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn analysis_timeout(&self) -> Option<Duration> {
        self.analysis_timeout_ms.map(Duration::from_millis)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cached_documents: DEFAULT_MAX_CACHED_DOCUMENTS,
            max_scope_size: DEFAULT_MAX_SCOPE_SIZE,
            debounce_delay_ms: DEFAULT_DEBOUNCE_DELAY_MS,
            scope_expansion_lines: DEFAULT_SCOPE_EXPANSION_LINES,
            enable_dependency_tracking: true,
            transitive_dependency_tracking: false,
            enable_cross_file_analysis: true,
            min_confidence_threshold: DEFAULT_MIN_CONFIDENCE_THRESHOLD,
            analysis_timeout_ms: None,
            scope_match_tolerance: DEFAULT_SCOPE_MATCH_TOLERANCE,
        }
    }
}

/// Reads the engine configuration from a JSON file, falling back to defaults when the
/// file cannot be read or parsed.
pub fn read_engine_configuration(path: &Path) -> EngineConfig {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "Could not read engine configuration at {}: {}. Returning default configuration.",
                path.display(),
                e
            );
            return EngineConfig::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(configuration) => configuration,
        Err(e) => {
            warn!(
                "Could not parse engine configuration at {}: {}. Returning default configuration.",
                path.display(),
                e
            );
            EngineConfig::default()
        }
    }
}
