//! Pipeline runner - fail-fast ordered stage execution

use crate::core::pipeline::Pipeline;
use crate::core::stage::{Stage, StageAction};
use crate::core::state::{ExecutionStatus, StageState};
use crate::execution::invoker::{InvokeError, ProcessInvoker};
use crate::execution::INTERNAL_EXIT_CODE;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Why a pipeline run aborted
#[derive(Debug, Error)]
pub enum RunError {
    /// An external tool ran and reported failure
    #[error("stage '{stage}' failed with status {status}")]
    StageFailed { stage: String, status: i32 },

    /// An external tool could not be started at all
    #[error("stage '{stage}': {source}")]
    Spawn {
        stage: String,
        #[source]
        source: InvokeError,
    },

    /// A filesystem stage (rename, copy, delete) failed
    #[error("stage '{stage}': {source}")]
    Filesystem {
        stage: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// The process exit code this failure maps to: the failing tool's own
    /// status, or the internal error code for orchestrator-side failures
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::StageFailed { status, .. } => *status,
            RunError::Spawn { .. } | RunError::Filesystem { .. } => INTERNAL_EXIT_CODE,
        }
    }

    /// Name of the stage that aborted the run
    pub fn stage(&self) -> &str {
        match self {
            RunError::StageFailed { stage, .. }
            | RunError::Spawn { stage, .. }
            | RunError::Filesystem { stage, .. } => stage,
        }
    }
}

/// Events emitted during a pipeline run
#[derive(Debug, Clone)]
pub enum RunEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_stages: usize,
    },
    StageStarted {
        stage: String,
        action: String,
    },
    StageCompleted {
        stage: String,
    },
    StageFailed {
        stage: String,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Executes a pipeline's stages strictly in declaration order
///
/// The first failing stage aborts the run; stages after it never execute,
/// and artifacts already produced are left in place for inspection.
pub struct PipelineRunner<I> {
    invoker: I,
    event_handlers: Vec<EventHandler>,
}

impl<I: ProcessInvoker> PipelineRunner<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit(&self, event: RunEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the pipeline, stopping at the first failure
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<(), RunError> {
        let execution_id = pipeline.state.execution_id;
        info!(
            "Starting pipeline run: {} ({})",
            pipeline.name, execution_id
        );
        self.emit(RunEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            total_stages: pipeline.stages.len(),
        });

        pipeline.state.start(pipeline.stages.len());

        for index in 0..pipeline.stages.len() {
            let stage = pipeline.stages[index].clone();
            let started_at = Utc::now();

            pipeline.stages[index].state = StageState::Running { started_at };
            self.emit(RunEvent::StageStarted {
                stage: stage.name.clone(),
                action: stage.describe(),
            });

            match self.execute_stage(&stage).await {
                Ok(()) => {
                    pipeline.stages[index].state = StageState::Completed {
                        started_at,
                        completed_at: Utc::now(),
                    };
                    pipeline.state.completed_stages += 1;
                    self.emit(RunEvent::StageCompleted {
                        stage: stage.name.clone(),
                    });
                }
                Err(run_error) => {
                    error!("Stage {} failed: {}", stage.name, run_error);
                    pipeline.stages[index].state = StageState::Failed {
                        error: run_error.to_string(),
                        started_at,
                        failed_at: Utc::now(),
                    };
                    pipeline.state.fail();
                    self.emit(RunEvent::StageFailed {
                        stage: stage.name.clone(),
                        error: run_error.to_string(),
                    });
                    self.emit(RunEvent::PipelineCompleted {
                        execution_id,
                        status: ExecutionStatus::Failed,
                    });
                    return Err(run_error);
                }
            }
        }

        pipeline.state.complete();
        info!("Pipeline run finished: {}", pipeline.name);
        self.emit(RunEvent::PipelineCompleted {
            execution_id,
            status: ExecutionStatus::Completed,
        });

        Ok(())
    }

    async fn execute_stage(&self, stage: &Stage) -> Result<(), RunError> {
        match &stage.action {
            StageAction::Invoke(command) => {
                let status =
                    self.invoker
                        .invoke(command)
                        .await
                        .map_err(|source| RunError::Spawn {
                            stage: stage.name.clone(),
                            source,
                        })?;
                if status != 0 {
                    return Err(RunError::StageFailed {
                        stage: stage.name.clone(),
                        status,
                    });
                }
                Ok(())
            }
            StageAction::Rename { from, to } => {
                debug!("Renaming {} -> {}", from.display(), to.display());
                tokio::fs::rename(from, to)
                    .await
                    .map_err(|source| RunError::Filesystem {
                        stage: stage.name.clone(),
                        source,
                    })
            }
            StageAction::CopyFile { from, to } => {
                debug!("Copying {} -> {}", from.display(), to.display());
                tokio::fs::copy(from, to)
                    .await
                    .map(|_| ())
                    .map_err(|source| RunError::Filesystem {
                        stage: stage.name.clone(),
                        source,
                    })
            }
            StageAction::RemoveDir { path } => {
                debug!("Removing {}", path.display());
                tokio::fs::remove_dir_all(path)
                    .await
                    .map_err(|source| RunError::Filesystem {
                        stage: stage.name.clone(),
                        source,
                    })
            }
        }
    }
}
