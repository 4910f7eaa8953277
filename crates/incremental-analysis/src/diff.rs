//! Line-level change detection.
//!
//! Both versions are split into lines and aligned on their longest common subsequence.
//! Lines of the new version that are not part of the alignment are inserts, lines of
//! the old version that are not part of it are deletes, and a simultaneous mismatch on
//! both sides is a replace. Touching regions of the same kind are merged.
//!
//! The table is O(m·n) in time and space over the lines between the common prefix and
//! the common suffix, which are stripped first.

use document_model::{ChangeKind, ChangeRegion};

/// A region under construction, still holding borrowed lines.
struct PendingRegion<'a> {
    kind: ChangeKind,
    start_line: usize,
    end_line: usize,
    lines: Vec<&'a str>,
    previous_lines: Vec<&'a str>,
}

impl<'a> PendingRegion<'a> {
    fn touches(&self, other: &PendingRegion<'a>) -> bool {
        self.kind == other.kind && other.start_line <= self.end_line + 1
    }

    fn absorb(&mut self, other: PendingRegion<'a>) {
        self.end_line = self.end_line.max(other.end_line);
        self.lines.extend(other.lines);
        self.previous_lines.extend(other.previous_lines);
    }

    fn into_region(self) -> ChangeRegion {
        let end_column = match self.kind {
            ChangeKind::Delete => 0,
            _ => self.lines.last().map_or(0, |l| l.chars().count()),
        };
        let previous_content = match self.kind {
            ChangeKind::Insert => None,
            _ => Some(self.previous_lines.join("\n")),
        };

        ChangeRegion {
            start_line: self.start_line,
            end_line: self.end_line,
            start_column: 0,
            end_column,
            kind: self.kind,
            content: self.lines.join("\n"),
            previous_content,
        }
    }
}

/// Computes the ordered, merged change regions turning `old_content` into `new_content`.
/// Region line numbers refer to `new_content`.
pub fn diff(old_content: &str, new_content: &str) -> Vec<ChangeRegion> {
    if old_content == new_content {
        return Vec::new();
    }

    let old_lines: Vec<&str> = old_content.split('\n').collect();
    let new_lines: Vec<&str> = new_content.split('\n').collect();

    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_lines.len().min(new_lines.len()) - prefix;
    let suffix = old_lines
        .iter()
        .rev()
        .zip(new_lines.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_window = &old_lines[prefix..old_lines.len() - suffix];
    let new_window = &new_lines[prefix..new_lines.len() - suffix];
    let common = longest_common_subsequence(old_window, new_window);

    let mut pending: Vec<PendingRegion> = Vec::new();
    let (mut i, mut j, mut k) = (0, 0, 0);

    while i < old_window.len() || j < new_window.len() {
        let anchor = common.get(k);
        let old_matches = i < old_window.len() && anchor == Some(&old_window[i]);
        let new_matches = j < new_window.len() && anchor == Some(&new_window[j]);

        if old_matches && new_matches {
            i += 1;
            j += 1;
            k += 1;
            continue;
        }

        let line = prefix + j;
        let region = if i < old_window.len() && !old_matches && j < new_window.len() && !new_matches
        {
            let region = PendingRegion {
                kind: ChangeKind::Replace,
                start_line: line,
                end_line: line,
                lines: vec![new_window[j]],
                previous_lines: vec![old_window[i]],
            };
            i += 1;
            j += 1;
            region
        } else if j < new_window.len() && !new_matches {
            let region = PendingRegion {
                kind: ChangeKind::Insert,
                start_line: line,
                end_line: line,
                lines: vec![new_window[j]],
                previous_lines: Vec::new(),
            };
            j += 1;
            region
        } else {
            let region = PendingRegion {
                kind: ChangeKind::Delete,
                start_line: line,
                end_line: line,
                lines: Vec::new(),
                previous_lines: vec![old_window[i]],
            };
            i += 1;
            region
        };

        match pending.last_mut() {
            Some(last) if last.touches(&region) => last.absorb(region),
            _ => pending.push(region),
        }
    }

    pending.into_iter().map(PendingRegion::into_region).collect()
}

/// Classic dynamic-programming LCS over lines, backtracked into the common lines.
fn longest_common_subsequence<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<&'a str> {
    let (m, n) = (old.len(), new.len());
    if m == 0 || n == 0 {
        return Vec::new();
    }

    let width = n + 1;
    let mut table = vec![0u32; (m + 1) * width];
    for i in 1..=m {
        for j in 1..=n {
            table[i * width + j] = if old[i - 1] == new[j - 1] {
                table[(i - 1) * width + (j - 1)] + 1
            } else {
                table[(i - 1) * width + j].max(table[i * width + (j - 1)])
            };
        }
    }

    let mut common = Vec::with_capacity(table[m * width + n] as usize);
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if old[i - 1] == new[j - 1] {
            common.push(old[i - 1]);
            i -= 1;
            j -= 1;
        } else if table[(i - 1) * width + j] >= table[i * width + (j - 1)] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    common.reverse();
    common
}
