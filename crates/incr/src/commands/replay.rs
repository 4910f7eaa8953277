use anyhow::Result;
use document_model::{Coverage, IncrementalAnalysisResult, Issue};
use incremental_analysis::{AnalysisEngine, EngineConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::markers::MarkerAnalyzer;
use crate::utils::{infer_language, read_source};

/// One line of replay output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PassSummary<'a> {
    file: String,
    version: i64,
    analyzed: Vec<&'a str>,
    skipped: Vec<&'a str>,
    new_issues: &'a [Issue],
    resolved_issues: &'a [Issue],
    unchanged_issues: &'a [Issue],
    coverage: &'a Coverage,
    analysis_time_ms: u64,
}

impl<'a> PassSummary<'a> {
    fn new(file: &Path, result: &'a IncrementalAnalysisResult) -> Self {
        Self {
            file: file.display().to_string(),
            version: result.version,
            analyzed: result.analyzed_scope_names(),
            skipped: result.skipped_scope_names(),
            new_issues: &result.new_issues,
            resolved_issues: &result.resolved_issues,
            unchanged_issues: &result.unchanged_issues,
            coverage: &result.coverage,
            analysis_time_ms: result.analysis_time_ms,
        }
    }
}

pub async fn run(
    files: Vec<PathBuf>,
    language: Option<String>,
    uri: String,
    config: EngineConfig,
) -> Result<()> {
    let language = match language {
        Some(language) => language,
        None => files
            .first()
            .map(|file| infer_language(file))
            .unwrap_or_default(),
    };

    let engine = AnalysisEngine::new(config)?;
    engine.register_analyzer(&language, Arc::new(MarkerAnalyzer::default()));

    for (index, file) in files.iter().enumerate() {
        let content = read_source(file)?;
        let version = index as i64 + 1;
        let result = engine.analyze(&uri, &content, &language, version).await;
        println!("{}", serde_json::to_string(&PassSummary::new(file, &result))?);
    }

    let statistics = engine.get_statistics();
    info!(
        "Replayed {} versions of {} ({} cached documents)",
        files.len(),
        uri,
        statistics.cached_documents
    );
    Ok(())
}
