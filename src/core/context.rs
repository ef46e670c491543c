//! Ingest run context - identifiers threaded across workflow states

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Context for one ingest workflow run
///
/// Created at workflow start from configuration; the only mutation after
/// that is recording the dump identifier discovered by the download state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Schema version the dump must be compatible with
    pub schema_version: String,

    /// Parallelism forwarded to the external verify tool
    pub threads: usize,

    /// Where the download state writes its result metadata
    pub result_file: PathBuf,

    /// Identifier of the dump being ingested
    dump_id: Option<String>,
}

impl RunContext {
    pub fn new(
        schema_version: impl Into<String>,
        threads: usize,
        result_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            schema_version: schema_version.into(),
            threads,
            result_file: result_file.into(),
            dump_id: None,
        }
    }

    /// Seed the context with a pre-supplied dump identifier
    pub fn with_dump_id(mut self, dump_id: Option<String>) -> Self {
        self.dump_id = dump_id;
        self
    }

    pub fn dump_id(&self) -> Option<&str> {
        self.dump_id.as_deref()
    }

    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    /// Record the dump identifier produced by the download state.
    ///
    /// The identifier is write-once: a value already present is never
    /// replaced, so every later state observes the same identifier.
    pub fn record_dump_id(&mut self, dump_id: String) {
        debug_assert!(self.dump_id.is_none(), "dump identifier already recorded");
        self.dump_id.get_or_insert(dump_id);
    }
}
