//! Per-step timing report, written as CSV.
//!
//! Rows are built straight from the API and never touch the store.

use std::io;

use gha_stats_core::util::duration_seconds;
use serde::Serialize;
use thiserror::Error;

use crate::{
    ActionsSource,
    flatten::step_record,
    models::RunWithJobs,
    sync::{SyncError, SyncOptions, fetch_workflow, select_workflows},
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Fetch(#[from] SyncError),
    #[error("Failed to write CSV row")]
    Csv(#[from] csv::Error),
    #[error("Failed to flush CSV output")]
    Io(#[from] io::Error),
}

/// One step with its run context and how long it took.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct StepTiming {
    pub job_id: u64,
    pub run_id: u64,
    /// The run's name, empty if it has none.
    pub workflow_name: String,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub number: i64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    /// Empty when either timestamp is missing.
    pub seconds: Option<i64>,
}

impl StepTiming {
    pub const HEADER: [&'static str; 10] = [
        "job_id",
        "run_id",
        "workflow_name",
        "name",
        "status",
        "conclusion",
        "number",
        "started_at",
        "completed_at",
        "seconds",
    ];
}

pub fn step_timings(runs: &[RunWithJobs]) -> Vec<StepTiming> {
    let mut rows = Vec::new();
    for RunWithJobs { run, jobs } in runs {
        for job in jobs {
            for step in job.steps() {
                let record = step_record(job.id, step);
                let seconds =
                    duration_seconds(record.started_at.as_deref(), record.completed_at.as_deref());
                rows.push(StepTiming {
                    job_id: record.job_id,
                    run_id: job.run_id.into_inner(),
                    workflow_name: run.name.clone().unwrap_or_default(),
                    name: record.name,
                    status: record.status,
                    conclusion: record.conclusion,
                    number: record.number,
                    started_at: record.started_at,
                    completed_at: record.completed_at,
                    seconds,
                });
            }
        }
    }
    rows
}

/// Fetches the selected workflows and writes one CSV row per step to `writer`, header first.
/// Returns the number of rows written.
pub async fn write_step_timings<S: ActionsSource, W: io::Write>(
    source: &S,
    options: &SyncOptions,
    writer: W,
) -> Result<usize, ReportError> {
    let workflows = select_workflows(source, options.workflow).await?;
    // The header is written by hand so it is present even without rows
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(StepTiming::HEADER)?;
    let mut written = 0;
    for workflow in &workflows {
        let runs = fetch_workflow(source, workflow, options.concurrency).await?;
        for row in step_timings(&runs) {
            wtr.serialize(&row)?;
            written += 1;
        }
        tracing::debug!("Workflow {} ({}): {} step rows", workflow.id, workflow.name, written);
    }
    wtr.flush()?;
    Ok(written)
}
