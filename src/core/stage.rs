//! Stage domain model

use crate::core::state::StageState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An external command: program, arguments, and optional working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,

    /// Ordered argument list
    pub args: Vec<String>,

    /// Working directory for the spawned process
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<S, I, A>(program: S, args: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    /// Set the working directory the command runs in
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Render the command for log output
    pub fn display(&self) -> String {
        let line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        match &self.cwd {
            Some(dir) => format!("{} (in {})", line, dir.display()),
            None => line,
        }
    }
}

/// What a stage does when executed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageAction {
    /// Spawn an external command and wait for its exit status
    Invoke(CommandSpec),

    /// Move an artifact from a tool-default location to its canonical path
    Rename { from: PathBuf, to: PathBuf },

    /// Copy a single file into place
    CopyFile { from: PathBuf, to: PathBuf },

    /// Delete a scratch directory tree
    RemoveDir { path: PathBuf },
}

/// A single stage in a pipeline
///
/// Stages are declared as data: the action to perform plus the artifact
/// labels the stage reads and produces, used to validate that the pipeline
/// order respects the artifact hand-off between stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Unique stage name
    pub name: String,

    /// The action performed when this stage runs
    pub action: StageAction,

    /// Artifact labels this stage consumes
    pub reads: Vec<String>,

    /// Artifact labels this stage leaves behind
    pub produces: Vec<String>,

    /// Runtime state
    pub state: StageState,
}

impl Stage {
    fn new(name: impl Into<String>, action: StageAction) -> Self {
        Self {
            name: name.into(),
            action,
            reads: Vec::new(),
            produces: Vec::new(),
            state: StageState::Pending,
        }
    }

    /// Stage that spawns an external command
    pub fn invoke(name: impl Into<String>, command: CommandSpec) -> Self {
        Self::new(name, StageAction::Invoke(command))
    }

    /// Stage that relocates an artifact
    pub fn rename(name: impl Into<String>, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::new(
            name,
            StageAction::Rename {
                from: from.into(),
                to: to.into(),
            },
        )
    }

    /// Stage that copies a single file
    pub fn copy_file(
        name: impl Into<String>,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            name,
            StageAction::CopyFile {
                from: from.into(),
                to: to.into(),
            },
        )
    }

    /// Stage that deletes a directory tree
    pub fn remove_dir(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(name, StageAction::RemoveDir { path: path.into() })
    }

    /// Declare an artifact this stage reads
    pub fn reads(mut self, artifact: impl Into<String>) -> Self {
        self.reads.push(artifact.into());
        self
    }

    /// Declare an artifact this stage produces
    pub fn produces(mut self, artifact: impl Into<String>) -> Self {
        self.produces.push(artifact.into());
        self
    }

    /// Short description of the action for event output
    pub fn describe(&self) -> String {
        match &self.action {
            StageAction::Invoke(command) => command.display(),
            StageAction::Rename { from, to } => {
                format!("rename {} -> {}", from.display(), to.display())
            }
            StageAction::CopyFile { from, to } => {
                format!("copy {} -> {}", from.display(), to.display())
            }
            StageAction::RemoveDir { path } => format!("remove {}", path.display()),
        }
    }
}
