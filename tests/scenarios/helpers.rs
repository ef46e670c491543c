//! Test utility functions for datarun scenario tests

use async_trait::async_trait;
use datarun::{CommandSpec, InvokeError, ProcessInvoker, Stage};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

/// Invoker that replays scripted exit statuses and records every call
///
/// Statuses are consumed in call order; once the script runs out, every
/// further call succeeds with status 0.
pub struct ScriptedInvoker {
    statuses: Mutex<VecDeque<i32>>,
    calls: Mutex<Vec<CommandSpec>>,
    receipt: Option<(PathBuf, String)>,
}

impl ScriptedInvoker {
    pub fn succeeding() -> Self {
        Self::with_statuses(vec![])
    }

    pub fn with_statuses(statuses: Vec<i32>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            calls: Mutex::new(Vec::new()),
            receipt: None,
        }
    }

    /// When a `download` subcommand runs, write this content to the path,
    /// the way the real data CLI leaves result metadata behind
    pub fn write_receipt_on_download(
        mut self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        self.receipt = Some((path.into(), content.into()));
        self
    }

    /// Argument lists of every recorded call
    pub fn call_args(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|command| command.args.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether any recorded call carried the given subcommand
    pub fn invoked(&self, subcommand: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|command| command.args.iter().any(|arg| arg == subcommand))
    }
}

#[async_trait]
impl ProcessInvoker for ScriptedInvoker {
    async fn invoke(&self, command: &CommandSpec) -> Result<i32, InvokeError> {
        self.calls.lock().unwrap().push(command.clone());

        if let Some((path, content)) = &self.receipt {
            if command.args.iter().any(|arg| arg == "download") {
                std::fs::write(path, content).expect("failed to write scripted receipt");
            }
        }

        Ok(self.statuses.lock().unwrap().pop_front().unwrap_or(0))
    }
}

/// A stage invoking an external tool, for pipeline-shape tests
pub fn tool_stage(name: &str) -> Stage {
    Stage::invoke(name, CommandSpec::new("tool", [name]))
}
