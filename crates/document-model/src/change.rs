use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Delete,
    Replace,
}

/// One contiguous line-level edit, positioned in the lines of the newer document.
///
/// For a `Delete` the removed text lives in `previous_content` and `content` is empty;
/// the region sits at the line where the removed lines used to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRegion {
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub kind: ChangeKind,
    pub content: String,
    pub previous_content: Option<String>,
}

impl ChangeRegion {
    /// The region grown by `margin` lines on both sides, clamped at line zero.
    pub fn expanded(&self, margin: usize) -> (usize, usize) {
        (
            self.start_line.saturating_sub(margin),
            self.end_line.saturating_add(margin),
        )
    }
}
