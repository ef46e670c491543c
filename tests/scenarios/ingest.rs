//! Test: ingest workflow - conditional download, identifier threading,
//! malformed result metadata

use crate::helpers::*;
use datarun::{DataCli, IngestWorkflow, RunContext, WorkflowError, INTERNAL_EXIT_CODE};
use std::sync::Arc;

fn workflow(invoker: Arc<ScriptedInvoker>) -> IngestWorkflow<Arc<ScriptedInvoker>> {
    IngestWorkflow::new(invoker, DataCli::new("datacli", vec![]))
}

#[tokio::test]
async fn test_supplied_dump_id_never_downloads() {
    let invoker = Arc::new(ScriptedInvoker::succeeding());
    let mut context = RunContext::new("1.2.0", 1, "/nonexistent/result.json")
        .with_dump_id(Some("dump-supplied".to_string()));

    workflow(invoker.clone()).run(&mut context).await.unwrap();

    assert!(!invoker.invoked("download"));
    // The supplied identifier is the one passed to the schema check
    assert_eq!(
        invoker.call_args()[0],
        vec!["compareschemas", "dump-supplied", "1.2.0"]
    );
}

#[tokio::test]
async fn test_download_receipt_feeds_check_state() {
    let dir = tempfile::tempdir().unwrap();
    let receipt = dir.path().join("result.json");

    // The scripted CLI writes the result metadata the way the real
    // downloader does
    let invoker = Arc::new(
        ScriptedInvoker::succeeding()
            .write_receipt_on_download(&receipt, r#"{"DUMP_ID": "abc123"}"#),
    );
    let mut context = RunContext::new("1.2.0", 1, &receipt);

    workflow(invoker.clone()).run(&mut context).await.unwrap();

    assert_eq!(context.dump_id(), Some("abc123"));
    let calls = invoker.call_args();
    assert_eq!(calls[0][0], "download");
    assert_eq!(calls[1], vec!["compareschemas", "abc123", "1.2.0"]);
    assert_eq!(calls[2], vec!["verify", "abc123"]);
}

#[tokio::test]
async fn test_receipt_without_dump_id_aborts_before_check() {
    let dir = tempfile::tempdir().unwrap();
    let receipt = dir.path().join("result.json");

    let invoker = Arc::new(
        ScriptedInvoker::succeeding().write_receipt_on_download(&receipt, r#"{"BYTES": 4096}"#),
    );
    let mut context = RunContext::new("1.2.0", 1, &receipt);

    let workflow_error = workflow(invoker.clone())
        .run(&mut context)
        .await
        .unwrap_err();

    assert!(matches!(
        workflow_error,
        WorkflowError::MalformedResult { .. }
    ));
    assert_eq!(workflow_error.exit_code(), INTERNAL_EXIT_CODE);
    assert!(!invoker.invoked("compareschemas"));
}

#[tokio::test]
async fn test_missing_receipt_file_aborts_before_check() {
    let dir = tempfile::tempdir().unwrap();
    let receipt = dir.path().join("never-written.json");

    // Download reports success but leaves no metadata behind
    let invoker = Arc::new(ScriptedInvoker::succeeding());
    let mut context = RunContext::new("1.2.0", 1, &receipt);

    let workflow_error = workflow(invoker.clone())
        .run(&mut context)
        .await
        .unwrap_err();

    assert!(matches!(
        workflow_error,
        WorkflowError::MalformedResult { .. }
    ));
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn test_verify_failure_stops_update() {
    let invoker = Arc::new(ScriptedInvoker::with_statuses(vec![0, 9]));
    let mut context = RunContext::new("1.2.0", 1, "/nonexistent/result.json")
        .with_dump_id(Some("dump-7".to_string()));

    let workflow_error = workflow(invoker.clone())
        .update_store(true)
        .run(&mut context)
        .await
        .unwrap_err();

    assert!(matches!(
        workflow_error,
        WorkflowError::VerifyFailed { status: 9, .. }
    ));
    assert_eq!(workflow_error.exit_code(), 9);
    assert!(!invoker.invoked("updatestore"));
}

#[tokio::test]
async fn test_post_verify_threads_are_forwarded() {
    let invoker = Arc::new(ScriptedInvoker::succeeding());
    let mut context = RunContext::new("1.2.0", 12, "/nonexistent/result.json")
        .with_dump_id(Some("dump-7".to_string()));

    workflow(invoker.clone())
        .post_verify(true)
        .run(&mut context)
        .await
        .unwrap();

    assert_eq!(
        invoker.call_args()[1],
        vec!["-threads", "12", "postverify", "-i", "dump-7"]
    );
}

#[tokio::test]
async fn test_download_failure_surfaces_status() {
    let invoker = Arc::new(ScriptedInvoker::with_statuses(vec![2]));
    let mut context = RunContext::new("1.2.0", 1, "/nonexistent/result.json");

    let workflow_error = workflow(invoker.clone())
        .run(&mut context)
        .await
        .unwrap_err();

    assert!(matches!(
        workflow_error,
        WorkflowError::DownloadFailed { status: 2 }
    ));
    assert_eq!(workflow_error.exit_code(), 2);
    assert_eq!(invoker.call_count(), 1);
}
