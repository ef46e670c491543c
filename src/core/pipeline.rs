//! Pipeline domain model

use crate::core::stage::Stage;
use crate::core::state::{PipelineState, StageState};
use anyhow::{bail, Result};
use std::collections::HashSet;

/// An ordered, fail-fast sequence of stages
///
/// The dependency graph between stages is flattened into a fixed,
/// hand-verified order; the order is data, and [`Pipeline::validate`]
/// checks it against the declared artifact hand-off before anything runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Artifacts assumed to exist before the first stage runs
    pub inputs: Vec<String>,

    /// Stages in execution order
    pub stages: Vec<Stage>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            stages: Vec::new(),
            state: PipelineState::new(),
        }
    }

    /// Declare an artifact that exists before the pipeline starts
    pub fn input(mut self, artifact: impl Into<String>) -> Self {
        self.inputs.push(artifact.into());
        self
    }

    /// Append a stage
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Get a stage by name
    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Names of all stages in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Stages that completed successfully
    pub fn completed_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| matches!(s.state, StageState::Completed { .. }))
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Check the declared artifact hand-off against the stage order
    ///
    /// Every artifact a stage reads must be a declared input or produced by
    /// an earlier stage; stage names must be unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen_names = HashSet::new();
        let mut available: HashSet<&str> = self.inputs.iter().map(String::as_str).collect();

        for stage in &self.stages {
            if !seen_names.insert(stage.name.as_str()) {
                bail!("duplicate stage name: {}", stage.name);
            }

            for artifact in &stage.reads {
                if !available.contains(artifact.as_str()) {
                    bail!(
                        "stage '{}' reads artifact '{}' that no earlier stage produces",
                        stage.name,
                        artifact
                    );
                }
            }

            for artifact in &stage.produces {
                available.insert(artifact.as_str());
            }
        }

        Ok(())
    }
}
