//! datarun - a build-and-ingest orchestrator for data pipeline toolchains

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod staging;

// Re-export commonly used types
pub use crate::core::plans::DataCli;
pub use crate::core::{
    CommandSpec, Config, ExecutionStatus, Pipeline, RunContext, Stage, StageAction, StageState,
};
pub use crate::execution::{
    IngestWorkflow, InvokeError, PipelineRunner, ProcessInvoker, RunError, RunEvent,
    SystemInvoker, WorkflowError, INTERNAL_EXIT_CODE,
};
pub use crate::staging::{ScratchWorkspace, StagingError};
