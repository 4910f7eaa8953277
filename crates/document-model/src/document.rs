use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AnalysisScope, Issue};

/// Last known analysis state of one document, replaced wholesale after every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentState {
    pub uri: String,
    pub version: i64,
    pub content_hash: String,
    pub language: String,
    pub line_count: usize,
    pub last_modified_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub scopes: Vec<AnalysisScope>,
    /// The text the scopes were detected in. The next pass diffs against it.
    pub content: String,
}

impl DocumentState {
    /// Every issue currently held by the document's scopes, in scope order.
    pub fn all_issues(&self) -> Vec<Issue> {
        self.scopes
            .iter()
            .flat_map(|scope| scope.issues().iter().cloned())
            .collect()
    }
}
