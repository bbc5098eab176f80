use gha_stats_core::{config::SyncConfig, util::duration_seconds};
use gha_stats_db::{Database, DbError};
use octocrab::models::WorkflowId;
use thiserror::Error;

use crate::{
    ActionsError, ActionsSource,
    assemble::fetch_runs_with_jobs,
    flatten::{flatten_runs, workflow_record},
    models::{RunWithJobs, Workflow},
};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to list workflows")]
    Workflows(#[source] ActionsError),
    #[error("Workflow {0} not found in repository")]
    UnknownWorkflow(WorkflowId),
    #[error("Failed to fetch history of workflow {workflow_id} ({name})")]
    Workflow {
        workflow_id: WorkflowId,
        name: String,
        #[source]
        source: ActionsError,
    },
    #[error(transparent)]
    Persistence(#[from] DbError),
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Restrict the sync to a single workflow.
    pub workflow: Option<WorkflowId>,
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { workflow: None, concurrency: SyncConfig::default().concurrency() }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct LevelCount {
    pub fetched: u64,
    pub inserted: u64,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SyncSummary {
    pub workflows: LevelCount,
    pub runs: LevelCount,
    pub jobs: LevelCount,
    pub steps: LevelCount,
}

/// Copies the repository's Actions history into `db`.
///
/// All workflows are written first. Each workflow's runs, jobs and steps are then fetched in
/// full and written, parents before children, before the next workflow is fetched. An error
/// stops the sync; whatever was written before it stays.
pub async fn sync_repository<S: ActionsSource>(
    source: &S,
    db: &Database,
    options: &SyncOptions,
) -> Result<SyncSummary, SyncError> {
    let workflows = select_workflows(source, options.workflow).await?;

    let mut summary = SyncSummary::default();
    let records = workflows.iter().map(workflow_record).collect::<Vec<_>>();
    summary.workflows.fetched = records.len() as u64;
    summary.workflows.inserted = db.insert_workflows(&records).await?;

    for workflow in &workflows {
        let runs = fetch_workflow(source, workflow, options.concurrency).await?;
        log_job_durations(&runs);
        let records = flatten_runs(&runs);
        let runs_inserted = db.insert_runs(&records.runs).await?;
        let jobs_inserted = db.insert_jobs(&records.jobs).await?;
        let steps_inserted = db.insert_steps(&records.steps).await?;
        tracing::info!(
            "Workflow {} ({}): {} runs ({} new), {} jobs ({} new), {} steps ({} new)",
            workflow.id,
            workflow.name,
            records.runs.len(),
            runs_inserted,
            records.jobs.len(),
            jobs_inserted,
            records.steps.len(),
            steps_inserted
        );
        summary.runs.fetched += records.runs.len() as u64;
        summary.runs.inserted += runs_inserted;
        summary.jobs.fetched += records.jobs.len() as u64;
        summary.jobs.inserted += jobs_inserted;
        summary.steps.fetched += records.steps.len() as u64;
        summary.steps.inserted += steps_inserted;
    }
    Ok(summary)
}

/// Lists the repository's workflows, keeping only `filter` when given.
pub async fn select_workflows<S: ActionsSource>(
    source: &S,
    filter: Option<WorkflowId>,
) -> Result<Vec<Workflow>, SyncError> {
    let mut workflows = source.list_workflows().await.map_err(SyncError::Workflows)?;
    if let Some(workflow_id) = filter {
        workflows.retain(|w| w.id == workflow_id);
        if workflows.is_empty() {
            return Err(SyncError::UnknownWorkflow(workflow_id));
        }
    }
    tracing::info!("Found {} workflows", workflows.len());
    Ok(workflows)
}

/// Fetches one workflow's runs with their jobs, attributing failures to the workflow.
pub async fn fetch_workflow<S: ActionsSource>(
    source: &S,
    workflow: &Workflow,
    concurrency: usize,
) -> Result<Vec<RunWithJobs>, SyncError> {
    fetch_runs_with_jobs(source, workflow, concurrency).await.map_err(|e| SyncError::Workflow {
        workflow_id: workflow.id,
        name: workflow.name.clone(),
        source: e,
    })
}

fn log_job_durations(runs: &[RunWithJobs]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for RunWithJobs { run, jobs } in runs {
        for job in jobs {
            let steps = job.steps();
            let step_seconds = steps
                .iter()
                .filter_map(|s| duration_seconds(s.started_at.as_deref(), s.completed_at.as_deref()))
                .sum::<i64>();
            match duration_seconds(job.started_at.as_deref(), job.completed_at.as_deref()) {
                Some(seconds) => tracing::debug!(
                    "Run {} job {} ({}): {}s, {} steps ({}s)",
                    run.id,
                    job.id,
                    job.name,
                    seconds,
                    steps.len(),
                    step_seconds
                ),
                None => tracing::debug!(
                    "Run {} job {} ({}): {} ({} steps)",
                    run.id,
                    job.id,
                    job.name,
                    job.status,
                    steps.len()
                ),
            }
        }
    }
}
