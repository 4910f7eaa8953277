use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    File,
    Module,
    Class,
    Function,
    Block,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::File => "file",
            ScopeKind::Module => "module",
            ScopeKind::Class => "class",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named span of a document. Line numbers are zero-based and inclusive.
///
/// Scopes produced for one document may nest: a class and each of its methods are
/// emitted as separate scopes with overlapping ranges, so their issues are tracked
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisScope {
    pub kind: ScopeKind,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub content_hash: String,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub issues: Option<Vec<Issue>>,
}

impl AnalysisScope {
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Whether the inclusive line range `[start, end]` touches this scope.
    pub fn intersects(&self, start: usize, end: usize) -> bool {
        start <= self.end_line && end >= self.start_line
    }

    pub fn issues(&self) -> &[Issue] {
        self.issues.as_deref().unwrap_or_default()
    }

    /// Extracts this scope's text from the lines of the document it was detected in.
    pub fn extract_text(&self, lines: &[&str]) -> String {
        if lines.is_empty() || self.start_line >= lines.len() {
            return String::new();
        }
        let end = self.end_line.min(lines.len() - 1);
        lines[self.start_line..=end].join("\n")
    }
}
