//! CLI command definitions

use clap::Args;

/// Build and package the toolchain
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Copy the credentials file into the tools module before its compile
    #[arg(long)]
    pub copy_credentials: bool,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Run the ingest workflow
#[derive(Debug, Args, Clone)]
pub struct IngestCommand {
    /// Pre-supplied dump identifier; skips the download state
    #[arg(long)]
    pub dump_id: Option<String>,

    /// Thread count forwarded to the verify tool
    #[arg(long)]
    pub threads: Option<usize>,

    /// Use the threaded post-verify subcommand instead of plain verify
    #[arg(long)]
    pub post_verify: bool,

    /// Update the downstream store after a successful verify
    #[arg(long)]
    pub update: bool,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Build unified documentation
#[derive(Debug, Args, Clone)]
pub struct DocsCommand {
    /// Keep the scratch workspace on disk for debugging
    #[arg(long)]
    pub keep_workspace: bool,
}

/// Validate configuration and pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output the stage list in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show full details
    #[arg(long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific run by execution ID
    #[arg(long)]
    pub execution_id: Option<String>,
}

/// List pipelines seen in history
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show run counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
