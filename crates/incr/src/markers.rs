use async_trait::async_trait;
use document_model::{AnalysisScope, Issue};
use incremental_analysis::ScopeAnalyzer;
use serde_json::json;

pub const MAX_LINE_LENGTH: usize = 120;
const MARKERS: &[&str] = &["TODO", "FIXME", "XXX"];

/// Reports leftover work markers and over-long lines.
///
/// Issues carry the line text rather than its number, so an issue survives its scope
/// moving up or down the file.
pub struct MarkerAnalyzer {
    max_line_length: usize,
}

impl MarkerAnalyzer {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }
}

impl Default for MarkerAnalyzer {
    fn default() -> Self {
        Self::new(MAX_LINE_LENGTH)
    }
}

#[async_trait]
impl ScopeAnalyzer for MarkerAnalyzer {
    async fn analyze(
        &self,
        scope_text: &str,
        scopes: &[AnalysisScope],
    ) -> anyhow::Result<Vec<Issue>> {
        let scope = scopes.first().map(|s| s.name.as_str()).unwrap_or_default();
        let mut issues = Vec::new();

        for line in scope_text.lines() {
            let text = line.trim();
            if let Some(marker) = MARKERS.iter().find(|marker| text.contains(*marker)) {
                issues.push(json!({
                    "rule": "marker",
                    "marker": marker,
                    "scope": scope,
                    "text": text,
                }));
            }
            let length = line.chars().count();
            if length > self.max_line_length {
                issues.push(json!({
                    "rule": "line-length",
                    "length": length,
                    "scope": scope,
                    "text": text,
                }));
            }
        }

        Ok(issues)
    }
}
