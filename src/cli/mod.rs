//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    BuildCommand, DocsCommand, HistoryCommand, IngestCommand, ListCommand, ValidateCommand,
};

/// Build-and-ingest orchestrator for data pipeline toolchains
#[derive(Debug, Parser, Clone)]
#[command(name = "datarun")]
#[command(author = "Datarun Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A build-and-ingest orchestrator for data pipeline toolchains", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a YAML configuration overrides file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build and package the toolchain
    Build(BuildCommand),

    /// Run the download/check/verify/update ingest workflow
    Ingest(IngestCommand),

    /// Build unified documentation from a staged source tree
    Docs(DocsCommand),

    /// Validate the configuration and the pipeline definition
    Validate(ValidateCommand),

    /// Show run history
    History(HistoryCommand),

    /// List pipelines seen in history
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
