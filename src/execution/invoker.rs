//! External process invocation

use crate::core::stage::CommandSpec;
use crate::execution::INTERNAL_EXIT_CODE;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// Error starting an external program
///
/// A non-zero exit status is not an error at this layer; only failure to
/// start the program at all is, and that always aborts the whole run.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for process invocation - allows tests to substitute a scripted fake
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    /// Run the command to completion and return its exit status.
    ///
    /// The spawned program's stdout/stderr and filesystem effects are opaque
    /// here; callers decide whether a non-zero status aborts the run.
    async fn invoke(&self, command: &CommandSpec) -> Result<i32, InvokeError>;
}

#[async_trait]
impl<I: ProcessInvoker + ?Sized> ProcessInvoker for Arc<I> {
    async fn invoke(&self, command: &CommandSpec) -> Result<i32, InvokeError> {
        (**self).invoke(command).await
    }
}

/// Invoker that spawns real processes
///
/// Stdio is inherited so the external tool's own output reaches the
/// operator directly. There are no timeouts and no retries: the tools are
/// long-running batch jobs, and a hang blocks the run by design.
#[derive(Debug, Clone, Default)]
pub struct SystemInvoker;

impl SystemInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessInvoker for SystemInvoker {
    async fn invoke(&self, spec: &CommandSpec) -> Result<i32, InvokeError> {
        info!("Running {}", spec.display());

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        let status = command.status().await.map_err(|source| InvokeError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let code = match status.code() {
            Some(code) => code,
            None => {
                // Terminated by a signal; no status to propagate
                warn!("{} terminated without an exit code", spec.program);
                INTERNAL_EXIT_CODE
            }
        };

        info!("Return code: {}", code);
        Ok(code)
    }
}
