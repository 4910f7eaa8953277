use anyhow::Result;
use incremental_analysis::ScopeDetector;
use std::path::Path;
use tracing::debug;

use crate::utils::{infer_language, read_source};

pub fn run(file: &Path, language: Option<String>) -> Result<()> {
    let content = read_source(file)?;
    let language = language.unwrap_or_else(|| infer_language(file));
    debug!("Detecting scopes in {} as {}", file.display(), language);

    let scopes = ScopeDetector::new()?.detect(&content, &language);
    println!("{}", serde_json::to_string_pretty(&scopes)?);
    Ok(())
}
