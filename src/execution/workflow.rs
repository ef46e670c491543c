//! Ingest workflow - the download/check/verify/update state machine
//!
//! Transitions are strictly forward and linear. Any state's failure is
//! terminal: the run stops immediately and the failing state's exit status
//! becomes the orchestrator's own.

use crate::core::context::RunContext;
use crate::core::plans::DataCli;
use crate::execution::invoker::{InvokeError, ProcessInvoker};
use crate::execution::INTERNAL_EXIT_CODE;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Why an ingest run aborted
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to download dump (exit status {status})")]
    DownloadFailed { status: i32 },

    #[error("failed on schema check for dump {dump_id} (exit status {status})")]
    SchemaCheckFailed { dump_id: String, status: i32 },

    #[error("failed to verify dump {dump_id} (exit status {status})")]
    VerifyFailed { dump_id: String, status: i32 },

    #[error("failed to update downstream store for dump {dump_id} (exit status {status})")]
    UpdateFailed { dump_id: String, status: i32 },

    /// The result metadata file is missing, unparsable, or lacks the
    /// dump identifier; treated exactly like a failed state
    #[error("result metadata at {path} is unusable: {reason}")]
    MalformedResult { path: PathBuf, reason: String },

    #[error(transparent)]
    Spawn(#[from] InvokeError),
}

impl WorkflowError {
    /// The process exit code this failure maps to
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowError::DownloadFailed { status }
            | WorkflowError::SchemaCheckFailed { status, .. }
            | WorkflowError::VerifyFailed { status, .. }
            | WorkflowError::UpdateFailed { status, .. } => *status,
            WorkflowError::MalformedResult { .. } | WorkflowError::Spawn(_) => INTERNAL_EXIT_CODE,
        }
    }
}

/// Result metadata the download state leaves behind
#[derive(Debug, Deserialize)]
struct DownloadReceipt {
    #[serde(rename = "DUMP_ID")]
    dump_id: String,
}

/// Drives the external data CLI through one ingest run
pub struct IngestWorkflow<I> {
    invoker: I,
    cli: DataCli,
    post_verify: bool,
    update_store: bool,
}

impl<I: ProcessInvoker> IngestWorkflow<I> {
    pub fn new(invoker: I, cli: DataCli) -> Self {
        Self {
            invoker,
            cli,
            post_verify: false,
            update_store: false,
        }
    }

    /// Use the threaded post-verify subcommand instead of plain verify
    pub fn post_verify(mut self, enabled: bool) -> Self {
        self.post_verify = enabled;
        self
    }

    /// Run the downstream store update after a successful verify
    pub fn update_store(mut self, enabled: bool) -> Self {
        self.update_store = enabled;
        self
    }

    /// Run the workflow to completion or first failure
    pub async fn run(&self, context: &mut RunContext) -> Result<(), WorkflowError> {
        let dump_id = match context.dump_id() {
            Some(supplied) => {
                info!("Skipping download for dump {}", supplied);
                supplied.to_string()
            }
            None => {
                let downloaded = self.download(context.result_file()).await?;
                info!("Downloaded dump {}", downloaded);
                context.record_dump_id(downloaded.clone());
                downloaded
            }
        };

        self.check_schema(&dump_id, &context.schema_version).await?;
        self.verify(&dump_id, context.threads).await?;

        if self.update_store {
            self.update(&dump_id).await?;
        }

        Ok(())
    }

    async fn invoke<A: Into<String>>(
        &self,
        args: impl IntoIterator<Item = A>,
    ) -> Result<i32, WorkflowError> {
        Ok(self.invoker.invoke(&self.cli.command(args)).await?)
    }

    async fn download(&self, result_file: &Path) -> Result<String, WorkflowError> {
        let status = self
            .invoke([
                "download".to_string(),
                result_file.to_string_lossy().into_owned(),
            ])
            .await?;
        if status != 0 {
            return Err(WorkflowError::DownloadFailed { status });
        }
        read_receipt(result_file)
    }

    async fn check_schema(
        &self,
        dump_id: &str,
        schema_version: &str,
    ) -> Result<(), WorkflowError> {
        info!(
            "Comparing dump {} against schema version {}",
            dump_id, schema_version
        );
        let status = self
            .invoke(["compareschemas", dump_id, schema_version])
            .await?;
        if status != 0 {
            return Err(WorkflowError::SchemaCheckFailed {
                dump_id: dump_id.to_string(),
                status,
            });
        }
        Ok(())
    }

    async fn verify(&self, dump_id: &str, threads: usize) -> Result<(), WorkflowError> {
        let status = if self.post_verify {
            info!("Post-verifying dump {} with {} threads", dump_id, threads);
            self.invoke([
                "-threads".to_string(),
                threads.to_string(),
                "postverify".to_string(),
                "-i".to_string(),
                dump_id.to_string(),
            ])
            .await?
        } else {
            info!("Verifying dump {}", dump_id);
            self.invoke(["verify", dump_id]).await?
        };
        if status != 0 {
            return Err(WorkflowError::VerifyFailed {
                dump_id: dump_id.to_string(),
                status,
            });
        }
        Ok(())
    }

    async fn update(&self, dump_id: &str) -> Result<(), WorkflowError> {
        info!("Updating downstream store for dump {}", dump_id);
        let status = self.invoke(["updatestore", dump_id]).await?;
        if status != 0 {
            return Err(WorkflowError::UpdateFailed {
                dump_id: dump_id.to_string(),
                status,
            });
        }
        Ok(())
    }
}

/// Extract the dump identifier from the download result metadata
fn read_receipt(path: &Path) -> Result<String, WorkflowError> {
    let raw = std::fs::read_to_string(path).map_err(|source| WorkflowError::MalformedResult {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;
    let receipt: DownloadReceipt =
        serde_json::from_str(&raw).map_err(|source| WorkflowError::MalformedResult {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    Ok(receipt.dump_id)
}
