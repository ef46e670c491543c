//! Test: end-to-end scenarios across runner, workflow, and stager

use crate::helpers::*;
use datarun::core::plans;
use datarun::{
    Config, DataCli, ExecutionStatus, IngestWorkflow, Pipeline, PipelineRunner, RunContext,
    ScratchWorkspace, Stage,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[tokio::test]
async fn test_generator_failure_still_removes_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let scratch_root = dir.path().join("scratch");

    let invoker = Arc::new(ScriptedInvoker::with_statuses(vec![0, 3]));
    let exit_code = {
        let workspace = ScratchWorkspace::create(&scratch_root).unwrap();
        fs::write(workspace.path().join("staged.txt"), "tree").unwrap();

        let runner = PipelineRunner::new(invoker.clone());
        let mut pipeline = Pipeline::new("build")
            .stage(tool_stage("compile-client"))
            .stage(tool_stage("generate-bindings"))
            .stage(tool_stage("compile-bindings"))
            .stage(tool_stage("compile-tools"));

        match runner.execute(&mut pipeline).await {
            Ok(()) => 0,
            Err(run_error) => run_error.exit_code(),
        }
        // The workspace guard drops here, failure or not
    };

    assert_eq!(exit_code, 3);
    assert_eq!(invoker.call_count(), 2);
    assert!(!scratch_root.exists());
}

#[tokio::test]
async fn test_full_ingest_run_threads_identifier_to_final_state() {
    let dir = tempfile::tempdir().unwrap();
    let receipt = dir.path().join("result.json");

    let invoker = Arc::new(
        ScriptedInvoker::succeeding()
            .write_receipt_on_download(&receipt, r#"{"DUMP_ID": "abc123"}"#),
    );
    let mut context = RunContext::new("1.2.0", 1, &receipt);

    let workflow = IngestWorkflow::new(invoker.clone(), DataCli::new("datacli", vec![]))
        .update_store(true);
    workflow.run(&mut context).await.unwrap();

    let calls = invoker.call_args();
    assert_eq!(calls.len(), 4);
    // The final state received the identifier produced by the download
    assert_eq!(calls[3], vec!["updatestore", "abc123"]);
}

fn build_config(base: &Path, out: &Path, secure: &Path) -> Config {
    let mut vars = HashMap::new();
    vars.insert(
        "DATA_TOOLS_BASE".to_string(),
        base.to_string_lossy().into_owned(),
    );
    vars.insert(
        "DATA_GENERATED_OUTPUT".to_string(),
        out.to_string_lossy().into_owned(),
    );
    vars.insert(
        "DATA_SECURE_DIR".to_string(),
        secure.to_string_lossy().into_owned(),
    );
    vars.insert("DATA_SCHEMA_VERSION".to_string(), "1.2.0".to_string());
    vars.insert("DATA_SOURCE".to_string(), "canvas".to_string());
    vars.insert(
        "DATA_GENERATOR_CLASS".to_string(),
        "tools.CanvasGenerator".to_string(),
    );
    vars.insert("DATA_COPY_CREDENTIALS".to_string(), "true".to_string());
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn test_build_pipeline_relocates_and_cleans_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("tools-base");
    let out = dir.path().join("generated");
    let secure = dir.path().join("secure");

    let config = build_config(&base, &out, &secure);

    // Artifacts the external tools would have left behind
    let tools_target = config.tools_dir().join("target");
    fs::create_dir_all(&tools_target).unwrap();
    fs::write(tools_target.join("canvas_data_tools-1.0.0.jar"), "jar").unwrap();

    fs::create_dir_all(config.bindings_dir().join("src")).unwrap();
    fs::write(config.bindings_dir().join("src").join("T.java"), "class T {}").unwrap();

    fs::create_dir_all(&secure).unwrap();
    fs::write(config.credentials_file(), "secret=1").unwrap();
    let resources = config.tools_dir().join("src").join("main").join("resources");
    fs::create_dir_all(&resources).unwrap();

    let mut pipeline = plans::build_pipeline(&config).unwrap();
    pipeline.validate().unwrap();

    // The five compile/generate stages are scripted successes; the
    // filesystem stages act on the tree above
    let invoker = Arc::new(ScriptedInvoker::succeeding());
    let runner = PipelineRunner::new(invoker.clone());
    runner.execute(&mut pipeline).await.unwrap();

    assert_eq!(pipeline.state.status, ExecutionStatus::Completed);
    assert_eq!(invoker.call_count(), 5);

    // The packaged archive moved to its canonical path
    assert!(config.tools_archive().exists());
    assert!(!tools_target.join("canvas_data_tools-1.0.0.jar").exists());

    // The credentials file landed in the tools module resources
    assert_eq!(
        fs::read_to_string(resources.join("secure.properties")).unwrap(),
        "secret=1"
    );

    // The generated-bindings scratch tree is gone
    assert!(!config.bindings_dir().exists());
}

#[tokio::test]
async fn test_relocation_failure_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.jar");
    let dest = dir.path().join("out.jar");

    let invoker = Arc::new(ScriptedInvoker::succeeding());
    let runner = PipelineRunner::new(invoker.clone());
    let mut pipeline = Pipeline::new("build")
        .stage(tool_stage("compile-tools"))
        .stage(Stage::rename("package-tools", &missing, &dest))
        .stage(tool_stage("never-runs"));

    let run_error = runner.execute(&mut pipeline).await.unwrap_err();

    assert_eq!(run_error.stage(), "package-tools");
    // Only the stage before the failed relocation was invoked
    assert_eq!(invoker.call_count(), 1);
}
