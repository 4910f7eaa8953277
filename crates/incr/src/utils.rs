use anyhow::{Context, Result};
use incremental_analysis::{EngineConfig, read_engine_configuration};
use std::fs;
use std::path::Path;

/// Language tag for a file, from its extension. Unknown extensions get the generic
/// brace-based patterns.
pub fn infer_language(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" | "pyi" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "cs" => "csharp",
        _ => "generic",
    }
    .to_string()
}

pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> EngineConfig {
    path.map(read_engine_configuration).unwrap_or_default()
}
