use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "incr",
    version,
    about = "Incremental scope-level analysis of source files",
    long_about = "Detects scopes, diffs document versions and replays edits through the incremental analysis engine."
)]
pub struct IncrCli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine configuration file (JSON, camelCase keys)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write JSON logs to a rotating file in this directory instead of STDERR
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl IncrCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the scopes detected in a file
    Scopes {
        file: PathBuf,

        /// Language tag (inferred from the file extension when omitted)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Print the line-level change regions between two files
    Diff { old: PathBuf, new: PathBuf },
    /// Feed files as successive versions of one document through the engine
    Replay {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Language tag (inferred from the first file's extension when omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// Document URI the versions are analysed under
        #[arg(long, default_value = "replay://document")]
        uri: String,
    },
}
