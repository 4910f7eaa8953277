mod cli;
mod commands;
mod markers;
mod utils;

use crate::cli::{Commands, IncrCli};
use logging::LogMode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = IncrCli::parse_args();

    let mode = match cli.log_dir {
        Some(log_dir) => LogMode::File { log_dir },
        None => LogMode::Cli,
    };
    let _guards = logging::init(mode, cli.verbose)?;

    match cli.command {
        Commands::Scopes { file, language } => commands::scopes::run(&file, language),
        Commands::Diff { old, new } => commands::diff::run(&old, &new),
        Commands::Replay {
            files,
            language,
            uri,
        } => {
            let config = utils::load_config(cli.config.as_deref());
            commands::replay::run(files, language, uri, config).await
        }
    }
}
