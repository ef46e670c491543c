//! Scenario tests for the orchestrator, driven by a scripted invoker

mod helpers;

mod end_to_end;
mod fail_fast;
mod ingest;
mod staging;
