use serde::{Deserialize, Serialize};

use crate::{AnalysisScope, Issue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub lines_analyzed: usize,
    pub lines_skipped: usize,
    /// Share of the document's lines covered by analysed scopes. Nested scopes are
    /// counted once per scope, so this can exceed 100.
    pub percent_analyzed: f64,
}

impl Coverage {
    pub fn compute(
        analyzed: &[AnalysisScope],
        skipped: &[AnalysisScope],
        line_count: usize,
    ) -> Self {
        let lines_analyzed: usize = analyzed.iter().map(AnalysisScope::line_count).sum();
        let lines_skipped: usize = skipped.iter().map(AnalysisScope::line_count).sum();
        let percent_analyzed = if line_count == 0 {
            0.0
        } else {
            lines_analyzed as f64 / line_count as f64 * 100.0
        };

        Self {
            lines_analyzed,
            lines_skipped,
            percent_analyzed,
        }
    }
}

/// Outcome of one `analyze` call. Not persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalAnalysisResult {
    pub uri: String,
    pub version: i64,
    pub analyzed_scopes: Vec<AnalysisScope>,
    pub skipped_scopes: Vec<AnalysisScope>,
    pub new_issues: Vec<Issue>,
    pub resolved_issues: Vec<Issue>,
    pub unchanged_issues: Vec<Issue>,
    pub analysis_time_ms: u64,
    pub coverage: Coverage,
}

impl IncrementalAnalysisResult {
    pub fn analyzed_scope_names(&self) -> Vec<&str> {
        self.analyzed_scopes.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn skipped_scope_names(&self) -> Vec<&str> {
        self.skipped_scopes.iter().map(|s| s.name.as_str()).collect()
    }
}
