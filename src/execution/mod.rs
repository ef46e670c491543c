//! Pipeline and workflow execution

pub mod invoker;
pub mod runner;
pub mod workflow;

pub use invoker::{InvokeError, ProcessInvoker, SystemInvoker};
pub use runner::{EventHandler, PipelineRunner, RunError, RunEvent};
pub use workflow::{IngestWorkflow, WorkflowError};

/// Exit code for failures of the orchestrator itself (spawn failures,
/// filesystem errors, malformed artifacts) as opposed to an external
/// tool's own non-zero status, which is propagated unchanged.
pub const INTERNAL_EXIT_CODE: i32 = 70;
