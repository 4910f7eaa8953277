use anyhow::Result;
use std::path::Path;

use crate::utils::read_source;

pub fn run(old: &Path, new: &Path) -> Result<()> {
    let regions = incremental_analysis::diff(&read_source(old)?, &read_source(new)?);
    println!("{}", serde_json::to_string_pretty(&regions)?);
    Ok(())
}
