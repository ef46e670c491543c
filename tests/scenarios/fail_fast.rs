//! Test: fail-fast stage ordering - a failing stage stops everything after it

use crate::helpers::*;
use datarun::{Pipeline, PipelineRunner, RunError, StageState, SystemInvoker, INTERNAL_EXIT_CODE};
use std::sync::Arc;

fn four_stage_pipeline() -> Pipeline {
    Pipeline::new("test-build")
        .stage(tool_stage("compile-client"))
        .stage(tool_stage("generate-bindings"))
        .stage(tool_stage("compile-bindings"))
        .stage(tool_stage("compile-tools"))
}

#[tokio::test]
async fn test_all_stages_run_when_everything_succeeds() {
    let invoker = Arc::new(ScriptedInvoker::succeeding());
    let runner = PipelineRunner::new(invoker.clone());
    let mut pipeline = four_stage_pipeline();

    runner.execute(&mut pipeline).await.unwrap();

    assert_eq!(invoker.call_count(), 4);
    assert_eq!(
        pipeline.completed_stages(),
        vec![
            "compile-client",
            "generate-bindings",
            "compile-bindings",
            "compile-tools"
        ]
    );
}

#[tokio::test]
async fn test_no_stage_runs_after_a_failure() {
    // The generator (stage 2) exits with status 3
    let invoker = Arc::new(ScriptedInvoker::with_statuses(vec![0, 3]));
    let runner = PipelineRunner::new(invoker.clone());
    let mut pipeline = four_stage_pipeline();

    let run_error = runner.execute(&mut pipeline).await.unwrap_err();

    // The orchestrator reports exactly the generator's status
    assert_eq!(run_error.exit_code(), 3);
    assert_eq!(run_error.stage(), "generate-bindings");

    // Stages 3 and 4 were never invoked
    assert_eq!(invoker.call_count(), 2);
    assert!(matches!(
        pipeline.get("compile-bindings").unwrap().state,
        StageState::Pending
    ));
    assert!(matches!(
        pipeline.get("compile-tools").unwrap().state,
        StageState::Pending
    ));
}

#[tokio::test]
async fn test_failure_at_each_index_stops_later_stages() {
    for failing_index in 0..4 {
        let mut statuses = vec![0; failing_index];
        statuses.push(5);

        let invoker = Arc::new(ScriptedInvoker::with_statuses(statuses));
        let runner = PipelineRunner::new(invoker.clone());
        let mut pipeline = four_stage_pipeline();

        let run_error = runner.execute(&mut pipeline).await.unwrap_err();

        assert_eq!(run_error.exit_code(), 5);
        assert_eq!(invoker.call_count(), failing_index + 1);
    }
}

#[tokio::test]
async fn test_missing_program_aborts_with_internal_code() {
    let runner = PipelineRunner::new(SystemInvoker::new());
    let mut pipeline = Pipeline::new("test").stage(datarun::Stage::invoke(
        "compile-client",
        datarun::CommandSpec::new("datarun-missing-tool", Vec::<String>::new()),
    ));

    let run_error = runner.execute(&mut pipeline).await.unwrap_err();

    assert!(matches!(run_error, RunError::Spawn { .. }));
    assert_eq!(run_error.exit_code(), INTERNAL_EXIT_CODE);
    assert_eq!(run_error.stage(), "compile-client");
}
