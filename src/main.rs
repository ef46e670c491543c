mod cli;
mod core;
mod execution;
mod persistence;
mod staging;

use anyhow::{Context, Result};
use cli::commands::{
    BuildCommand, DocsCommand, HistoryCommand, IngestCommand, ListCommand, ValidateCommand,
};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::config::Config;
use crate::core::plans;
use crate::core::{CommandSpec, ExecutionStatus, RunContext};
use execution::{
    IngestWorkflow, PipelineRunner, ProcessInvoker, RunEvent, SystemInvoker, WorkflowError,
};
use persistence::{create_summary, InMemoryPersistence, PersistenceBackend, RunSummary};
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Build(cmd) => run_build(cmd, &cli).await?,
        Command::Ingest(cmd) => run_ingest(cmd, &cli).await?,
        Command::Docs(cmd) => run_docs(cmd, &cli).await?,
        Command::Validate(cmd) => validate(cmd, &cli)?,
        Command::History(cmd) => show_history(cmd).await?,
        Command::List(cmd) => list_pipelines(cmd).await?,
    }

    Ok(())
}

/// Assemble the configuration once, at process start
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(path) = &cli.config {
        config.apply_file(path)?;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "sqlite")]
async fn open_store(no_history: bool) -> Result<Arc<dyn PersistenceBackend>> {
    if no_history {
        Ok(Arc::new(InMemoryPersistence::new()))
    } else {
        Ok(Arc::new(persistence::SqliteRunStore::with_default_path().await?))
    }
}

#[cfg(not(feature = "sqlite"))]
async fn open_store(_no_history: bool) -> Result<Arc<dyn PersistenceBackend>> {
    Ok(Arc::new(InMemoryPersistence::new()))
}

async fn run_build(cmd: &BuildCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    if cmd.copy_credentials {
        config.copy_credentials = true;
    }

    let mut pipeline = plans::build_pipeline(&config)?;
    pipeline
        .validate()
        .context("Build pipeline definition is invalid")?;

    println!(
        "{} Loaded pipeline: {} ({} stages)",
        INFO,
        style(&pipeline.name).bold(),
        style(pipeline.stages.len()).cyan()
    );

    let store = open_store(cmd.no_history).await?;

    // Stage progress plus per-event lines above the bar
    let progress = create_progress_bar(pipeline.stages.len());
    let bar = progress.clone();
    let mut runner = PipelineRunner::new(SystemInvoker::new());
    runner.add_event_handler(move |event| {
        bar.println(format_run_event(&event));
        if matches!(event, RunEvent::StageCompleted { .. }) {
            bar.inc(1);
        }
    });

    println!();
    let result = runner.execute(&mut pipeline).await;
    progress.finish_and_clear();

    let exit_code = match &result {
        Ok(()) => 0,
        Err(run_error) => run_error.exit_code(),
    };
    let summary = create_summary(&pipeline, Some(exit_code));
    store.save_run(&summary).await?;
    if !cmd.no_history {
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.execution_id.to_string()[..8]).dim()
        );
    }

    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&pipeline.name).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Err(run_error) => {
            println!(
                "\n{} {} {} at stage {}",
                CROSS,
                style(&pipeline.name).bold(),
                style("failed").red(),
                style(run_error.stage()).yellow()
            );
            error!("{}", run_error);
            std::process::exit(run_error.exit_code());
        }
    }
}

async fn run_ingest(cmd: &IngestCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(dump_id) = &cmd.dump_id {
        config.dump_id = Some(dump_id.clone());
    }
    if let Some(threads) = cmd.threads {
        config.threads = threads;
    }
    if cmd.post_verify {
        config.post_verify = true;
    }
    if cmd.update {
        config.update_store = true;
    }

    let result_file = config.require_result_file()?.to_path_buf();
    let data_cli = plans::DataCli::from_config(&config)?;
    let workflow_name = format!("{}-ingest", config.source);

    println!(
        "{} Starting ingest workflow: {}",
        ROCKET,
        style(&workflow_name).bold()
    );

    let mut context = RunContext::new(config.schema_version.clone(), config.threads, result_file)
        .with_dump_id(config.dump_id.clone());

    let workflow = IngestWorkflow::new(SystemInvoker::new(), data_cli)
        .post_verify(config.post_verify)
        .update_store(config.update_store);

    let started_at = chrono::Utc::now();
    let result = workflow.run(&mut context).await;

    let total_states = if config.update_store { 4 } else { 3 };
    let (status, exit_code, completed) = match &result {
        Ok(()) => (ExecutionStatus::Completed, 0, total_states),
        Err(workflow_error) => (
            ExecutionStatus::Failed,
            workflow_error.exit_code(),
            completed_states(workflow_error),
        ),
    };

    let store = open_store(cmd.no_history).await?;
    let summary = RunSummary {
        execution_id: uuid::Uuid::new_v4(),
        pipeline_name: workflow_name.clone(),
        status,
        exit_code: Some(exit_code),
        dump_id: context.dump_id().map(|id| id.to_string()),
        started_at,
        completed_at: Some(chrono::Utc::now()),
        completed_stages: completed,
        total_stages: total_states,
    };
    store.save_run(&summary).await?;
    if !cmd.no_history {
        println!(
            "{} Run saved to history (ID: {})",
            INFO,
            style(&summary.execution_id.to_string()[..8]).dim()
        );
    }

    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&workflow_name).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Err(workflow_error) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&workflow_name).bold(),
                style("failed").red()
            );
            error!("{}", workflow_error);
            std::process::exit(workflow_error.exit_code());
        }
    }
}

/// How many workflow states finished before the failure
fn completed_states(workflow_error: &WorkflowError) -> usize {
    match workflow_error {
        WorkflowError::DownloadFailed { .. }
        | WorkflowError::MalformedResult { .. }
        | WorkflowError::Spawn(_) => 0,
        WorkflowError::SchemaCheckFailed { .. } => 1,
        WorkflowError::VerifyFailed { .. } => 2,
        WorkflowError::UpdateFailed { .. } => 3,
    }
}

async fn run_docs(cmd: &DocsCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let scratch_root = std::env::temp_dir().join("datarun-docs");
    let mut workspace = staging::ScratchWorkspace::create(&scratch_root)?;
    if cmd.keep_workspace {
        workspace.retain();
    }

    println!(
        "{} Staging unified source tree in {}",
        INFO,
        style(scratch_root.display()).dim()
    );

    let code_dir = workspace.copy_tree(&config.client_dir(), "code")?;
    for module in plans::docs_modules(&config) {
        let sources = module.join("src").join("main").join("java");
        workspace.merge_tree(&sources, "code/src/main/java")?;
    }

    let invoker = SystemInvoker::new();
    let status = invoker
        .invoke(&CommandSpec::new("mvn", ["javadoc:javadoc"]).in_dir(code_dir.clone()))
        .await?;
    if status != 0 {
        println!("{} Documentation build {}", CROSS, style("failed").red());
        error!("mvn javadoc:javadoc exited with status {}", status);
        // process::exit skips destructors; tear the workspace down first
        drop(workspace);
        std::process::exit(status);
    }

    let apidocs = code_dir.join("target").join("site").join("apidocs");
    let dest = config.tools_base.join("apidocs");
    staging::publish_tree(&apidocs, &dest)?;

    println!(
        "{} Documentation published to {}",
        CHECK,
        style(dest.display()).bold()
    );
    if cmd.keep_workspace {
        println!(
            "{} Workspace kept at {}",
            INFO,
            style(scratch_root.display()).dim()
        );
    }

    Ok(())
}

fn validate(cmd: &ValidateCommand, cli: &Cli) -> Result<()> {
    println!("{} Validating configuration and pipeline...", INFO);

    let result = load_config(cli).and_then(|config| {
        let pipeline = plans::build_pipeline(&config)?;
        pipeline.validate()?;
        Ok((config, pipeline))
    });

    match result {
        Ok((config, pipeline)) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Source: {}", style(&config.source).bold());
            println!("  Schema version: {}", style(&config.schema_version).cyan());
            println!("  Stages: {}", style(pipeline.stages.len()).cyan());

            if cmd.json {
                let stages: Vec<_> = pipeline
                    .stages
                    .iter()
                    .map(|stage| {
                        serde_json::json!({
                            "name": stage.name,
                            "action": stage.describe(),
                            "reads": stage.reads,
                            "produces": stage.produces,
                        })
                    })
                    .collect();
                let data = serde_json::json!({
                    "pipeline": pipeline.name,
                    "stages": stages,
                });
                println!("\n{}", serde_json::to_string_pretty(&data)?);
            }
            Ok(())
        }
        Err(validation_error) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(validation_error).red());
            std::process::exit(1);
        }
    }
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_store(false).await?;

    // If a specific run is requested
    if let Some(exec_id_str) = &cmd.execution_id {
        let exec_id =
            uuid::Uuid::parse_str(exec_id_str).context("Invalid execution ID format")?;
        match store.load_run(exec_id).await? {
            Some(summary) => print_run_details(&summary, cmd.verbose)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    // List runs for one pipeline or all
    let runs = if let Some(pipeline_name) = &cmd.pipeline {
        store.list_runs(pipeline_name).await?
    } else {
        let pipelines = store.list_pipelines().await?;
        let mut all_runs = Vec::new();
        for pipeline in &pipelines {
            all_runs.extend(store.list_runs(pipeline).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs.into_iter().take(cmd.limit).collect()
    };

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

async fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let store = open_store(false).await?;
    let pipelines = store.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{} No pipelines found in history", INFO);
        return Ok(());
    }

    println!("{} Pipelines in history:", INFO);

    for pipeline_name in &pipelines {
        let runs = store.list_runs(pipeline_name).await?;

        if cmd.with_counts {
            let completed = runs
                .iter()
                .filter(|r| r.status == ExecutionStatus::Completed)
                .count();
            let failed = runs
                .iter()
                .filter(|r| r.status == ExecutionStatus::Failed)
                .count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(pipeline_name).bold(),
                style(runs.len()).cyan(),
                style(completed).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(pipeline_name).bold());
        }
    }

    if cmd.json {
        let mut json_data = Vec::new();
        for pipeline in &pipelines {
            let runs = store.list_runs(pipeline).await.ok();
            json_data.push(serde_json::json!({
                "name": pipeline,
                "run_count": runs.as_ref().map(|r| r.len()).unwrap_or(0)
            }));
        }
        let data = serde_json::json!({ "pipelines": json_data });
        println!("\n{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.execution_id).cyan());
    println!("  Pipeline: {}", style(&summary.pipeline_name).bold());
    println!("  Status: {}", format_status(summary.status));
    if let Some(exit_code) = summary.exit_code {
        println!("  Exit code: {}", style(exit_code).cyan());
    }
    if let Some(dump_id) = &summary.dump_id {
        println!("  Dump: {}", style(dump_id).cyan());
    }
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Progress: {} ({}/{})",
        style(format!("{:.0}%", summary.progress() * 100.0)).cyan(),
        summary.completed_stages,
        summary.total_stages
    );

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
