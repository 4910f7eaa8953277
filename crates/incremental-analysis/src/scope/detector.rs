use document_model::{AnalysisScope, ScopeKind, content_hash};
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::languages::{BlockStyle, FALLBACK_LANGUAGE, LanguageSpec, builtin_languages};
use crate::errors::Result;

/// Name given to declarations whose pattern captured no identifier.
pub const ANONYMOUS_SCOPE: &str = "anonymous";
/// Name of the scope synthesised when nothing was declared.
pub const FILE_SCOPE: &str = "file";

// The first keyword on a declaration line decides its kind.
const KIND_KEYWORDS: &str = r"\b(class|struct|interface|enum|trait|impl|record|union|mod|module|namespace|function|fn|def|func|fun)\b|=>";

#[derive(Debug)]
struct CompiledLanguage {
    name: String,
    block_style: BlockStyle,
    declarations: Vec<Regex>,
    dependencies: Vec<Regex>,
    exports: Vec<Regex>,
    ignored_names: HashSet<String>,
}

impl CompiledLanguage {
    fn compile(spec: &LanguageSpec) -> Result<Self> {
        let multi_line = |pattern: &String| RegexBuilder::new(pattern).multi_line(true).build();

        Ok(Self {
            name: spec.name.clone(),
            block_style: spec.block_style,
            declarations: spec
                .declarations
                .iter()
                .map(String::as_str)
                .map(Regex::new)
                .collect::<std::result::Result<_, _>>()?,
            dependencies: spec
                .dependencies
                .iter()
                .map(multi_line)
                .collect::<std::result::Result<_, _>>()?,
            exports: spec
                .exports
                .iter()
                .map(multi_line)
                .collect::<std::result::Result<_, _>>()?,
            ignored_names: spec.ignored_names.iter().cloned().collect(),
        })
    }

    /// Returns the declared name if `line` opens a declaration.
    fn declaration(&self, line: &str) -> Option<String> {
        self.declarations.iter().find_map(|pattern| {
            let captures = pattern.captures(line)?;
            match captures.name("name") {
                Some(name) if self.ignored_names.contains(name.as_str()) => None,
                Some(name) => Some(name.as_str().to_string()),
                None => Some(ANONYMOUS_SCOPE.to_string()),
            }
        })
    }
}

/// An open scope while scanning.
#[derive(Debug)]
struct Frame {
    kind: ScopeKind,
    name: String,
    start_line: usize,
    indent: usize,
    balance: i64,
    opened: bool,
}

/// Heuristic, line-based scope detection driven by per-language pattern tables.
///
/// This is not a parser: braces inside string literals or comments are counted like any
/// other brace, and declarations are recognised by regular expressions only.
#[derive(Debug, Clone)]
pub struct ScopeDetector {
    languages: HashMap<String, Arc<CompiledLanguage>>,
    kind_keywords: Regex,
}

impl ScopeDetector {
    pub fn new() -> Result<Self> {
        let mut detector = Self {
            languages: HashMap::new(),
            kind_keywords: Regex::new(KIND_KEYWORDS)?,
        };
        for spec in builtin_languages() {
            detector.register_language(&spec)?;
        }
        Ok(detector)
    }

    /// Adds a pattern table, replacing any table already registered under the same
    /// name or alias.
    pub fn register_language(&mut self, spec: &LanguageSpec) -> Result<()> {
        let compiled = Arc::new(CompiledLanguage::compile(spec)?);
        for key in std::iter::once(&spec.name).chain(spec.aliases.iter()) {
            self.languages
                .insert(key.to_lowercase(), Arc::clone(&compiled));
        }
        debug!(
            "Registered scope patterns for {} ({} aliases)",
            spec.name,
            spec.aliases.len()
        );
        Ok(())
    }

    pub fn supports(&self, language: &str) -> bool {
        self.languages.contains_key(&language.to_lowercase())
    }

    fn table_for(&self, language: &str) -> Option<&CompiledLanguage> {
        self.languages
            .get(&language.to_lowercase())
            .or_else(|| self.languages.get(FALLBACK_LANGUAGE))
            .map(Arc::as_ref)
    }

    /// Partitions `content` into scopes. Nested declarations yield nested, overlapping
    /// scopes. The result is never empty.
    pub fn detect(&self, content: &str, language: &str) -> Vec<AnalysisScope> {
        let lines: Vec<&str> = content.split('\n').collect();
        let last_line = lines.len() - 1;

        let Some(table) = self.table_for(language) else {
            return vec![self.file_scope(&lines, language)];
        };

        let mut open: Vec<Frame> = Vec::new();
        let mut spans: Vec<(Frame, usize)> = Vec::new();

        for index in 0..lines.len() {
            match table.block_style {
                BlockStyle::Braces => {
                    self.scan_braced_line(table, &lines, index, &mut open, &mut spans)
                }
                BlockStyle::Indentation => {
                    self.scan_indented_line(table, &lines, index, &mut open, &mut spans)
                }
            }
        }

        while let Some(frame) = open.pop() {
            spans.push((frame, last_line));
        }

        if spans.is_empty() {
            return vec![self.file_scope(&lines, language)];
        }

        spans.sort_by(|(a, a_end), (b, b_end)| {
            a.start_line
                .cmp(&b.start_line)
                .then_with(|| b_end.cmp(a_end))
        });

        debug!(
            "Detected {} scopes in {} lines using {} patterns",
            spans.len(),
            lines.len(),
            table.name
        );

        spans
            .into_iter()
            .map(|(frame, end_line)| self.finalize(table, &lines, frame, end_line, language))
            .collect()
    }

    fn scan_braced_line(
        &self,
        table: &CompiledLanguage,
        lines: &[&str],
        index: usize,
        open: &mut Vec<Frame>,
        spans: &mut Vec<(Frame, usize)>,
    ) {
        let line = lines[index];

        if let Some(name) = table.declaration(line) {
            let frame = Frame {
                kind: self.infer_kind(line),
                name,
                start_line: index,
                indent: indentation(line),
                balance: 0,
                opened: false,
            };
            if line.contains('{') || block_opens_after(table, lines, index) {
                open.push(frame);
            } else {
                spans.push((frame, index));
            }
        }

        let balanced = match open.last_mut() {
            Some(top) => {
                let (opens, closes) = count_braces(line);
                top.balance += opens - closes;
                if opens > 0 {
                    top.opened = true;
                }
                top.opened && top.balance <= 0
            }
            None => false,
        };

        if balanced {
            if let Some(frame) = open.pop() {
                spans.push((frame, index));
            }
        }
    }

    fn scan_indented_line(
        &self,
        table: &CompiledLanguage,
        lines: &[&str],
        index: usize,
        open: &mut Vec<Frame>,
        spans: &mut Vec<(Frame, usize)>,
    ) {
        let line = lines[index];
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }

        let indent = indentation(line);
        while open.last().is_some_and(|top| indent <= top.indent) {
            if let Some(frame) = open.pop() {
                let end_line = last_non_blank_before(lines, index).max(frame.start_line);
                spans.push((frame, end_line));
            }
        }

        if let Some(name) = table.declaration(line) {
            open.push(Frame {
                kind: self.infer_kind(line),
                name,
                start_line: index,
                indent,
                balance: 0,
                opened: true,
            });
        }
    }

    fn infer_kind(&self, line: &str) -> ScopeKind {
        let Some(found) = self.kind_keywords.find(line) else {
            return ScopeKind::Block;
        };
        match found.as_str() {
            "class" | "struct" | "interface" | "enum" | "trait" | "impl" | "record" | "union" => {
                ScopeKind::Class
            }
            "mod" | "module" | "namespace" => ScopeKind::Module,
            _ => ScopeKind::Function,
        }
    }

    fn finalize(
        &self,
        table: &CompiledLanguage,
        lines: &[&str],
        frame: Frame,
        end_line: usize,
        language: &str,
    ) -> AnalysisScope {
        let text = lines[frame.start_line..=end_line].join("\n");

        AnalysisScope {
            kind: frame.kind,
            name: frame.name,
            start_line: frame.start_line,
            end_line,
            language: language.to_string(),
            content_hash: content_hash(&text),
            dependencies: collect_names(&table.dependencies, &text),
            exports: collect_names(&table.exports, &text),
            last_analyzed_at: None,
            issues: None,
        }
    }

    fn file_scope(&self, lines: &[&str], language: &str) -> AnalysisScope {
        let text = lines.join("\n");
        let (dependencies, exports) = match self.table_for(language) {
            Some(table) => (
                collect_names(&table.dependencies, &text),
                collect_names(&table.exports, &text),
            ),
            None => (Vec::new(), Vec::new()),
        };

        AnalysisScope {
            kind: ScopeKind::File,
            name: FILE_SCOPE.to_string(),
            start_line: 0,
            end_line: lines.len().saturating_sub(1),
            language: language.to_string(),
            content_hash: content_hash(&text),
            dependencies,
            exports,
            last_analyzed_at: None,
            issues: None,
        }
    }
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn count_braces(line: &str) -> (i64, i64) {
    line.chars().fold((0, 0), |(opens, closes), c| match c {
        '{' => (opens + 1, closes),
        '}' => (opens, closes + 1),
        _ => (opens, closes),
    })
}

// Allman style: `fn foo()` followed by a line holding only the opening brace.
fn paren_delta(line: &str) -> i64 {
    line.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

/// Whether a declaration without `{` on its own line opens a block further down. This
/// covers Allman braces and parameter lists that span several lines, optionally followed
/// by a `where` clause or return type before the brace.
fn block_opens_after(table: &CompiledLanguage, lines: &[&str], index: usize) -> bool {
    let mut depth = paren_delta(lines[index]);
    let mut cursor = index;
    while depth > 0 {
        cursor += 1;
        match lines.get(cursor) {
            Some(line) if !line.trim_end().ends_with(';') => depth += paren_delta(line),
            _ => return false,
        }
    }

    if cursor == index {
        return next_line_opens_block(lines, index);
    }
    if lines[cursor].contains('{') {
        return true;
    }

    for line in &lines[cursor + 1..] {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if table.declaration(line).is_some() || trimmed.ends_with(';') || trimmed.starts_with('}') {
            return false;
        }
        if trimmed.contains('{') {
            return true;
        }
    }
    false
}

fn next_line_opens_block(lines: &[&str], index: usize) -> bool {
    lines[index + 1..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .is_some_and(|l| l.starts_with('{'))
}

fn last_non_blank_before(lines: &[&str], index: usize) -> usize {
    (0..index)
        .rev()
        .find(|&i| !lines[i].trim().is_empty())
        .unwrap_or(0)
}

/// Runs every pattern over `text` and returns the captured names, first occurrence wins.
fn collect_names(patterns: &[Regex], text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for pattern in patterns {
        for captures in pattern.captures_iter(text) {
            let Some(capture) = captures.get(1) else {
                continue;
            };
            for item in capture.as_str().split(',') {
                let item = item.trim().trim_matches(|c| c == '\'' || c == '"').trim();
                let name = item.rsplit(" as ").next().unwrap_or(item).trim();
                if !name.is_empty() && seen.insert(name.to_string()) {
                    names.push(name.to_string());
                }
            }
        }
    }

    names
}
