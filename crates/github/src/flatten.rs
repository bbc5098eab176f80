//! Projection of API objects onto the flat records the store keeps.
//!
//! Values are passed through untouched, including nulls. Fields the store has no column for
//! are dropped.

use gha_stats_core::models::{
    FlatRecords, JobRecord, RunRecord, StepKey, StepRecord, WorkflowRecord,
};
use octocrab::models::JobId;

use crate::models::{Job, Run, RunWithJobs, Step, Workflow};

pub fn workflow_record(workflow: &Workflow) -> WorkflowRecord {
    WorkflowRecord {
        id: workflow.id.into_inner(),
        name: workflow.name.clone(),
        path: workflow.path.clone(),
        state: workflow.state.clone(),
        created_at: workflow.created_at.clone(),
        updated_at: workflow.updated_at.clone(),
    }
}

pub fn run_record(run: &Run) -> RunRecord {
    RunRecord {
        id: run.id.into_inner(),
        name: run.name.clone(),
        head_branch: run.head_branch.clone(),
        head_sha: run.head_sha.clone(),
        display_title: run.display_title.clone(),
        run_number: run.run_number,
        event: run.event.clone(),
        status: run.status.clone(),
        conclusion: run.conclusion.clone(),
        workflow_id: run.workflow_id.into_inner(),
        created_at: run.created_at.clone(),
        updated_at: run.updated_at.clone(),
        run_attempt: run.run_attempt,
        run_started_at: run.run_started_at.clone(),
    }
}

pub fn job_record(job: &Job) -> JobRecord {
    JobRecord {
        id: job.id.into_inner(),
        run_id: job.run_id.into_inner(),
        run_attempt: job.run_attempt,
        status: job.status.clone(),
        conclusion: job.conclusion.clone(),
        created_at: job.created_at.clone(),
        started_at: job.started_at.clone(),
        completed_at: job.completed_at.clone(),
        name: job.name.clone(),
    }
}

/// The step's number is taken as its identity within the job.
pub fn step_record(job_id: JobId, step: &Step) -> StepRecord {
    let job_id = job_id.into_inner();
    StepRecord {
        id: StepKey::new(job_id, step.number),
        job_id,
        name: step.name.clone(),
        status: step.status.clone(),
        conclusion: step.conclusion.clone(),
        number: step.number,
        started_at: step.started_at.clone(),
        completed_at: step.completed_at.clone(),
    }
}

/// Flattens assembled runs into per-table records, parents ahead of their children.
pub fn flatten_runs(runs: &[RunWithJobs]) -> FlatRecords {
    let mut records = FlatRecords::default();
    for RunWithJobs { run, jobs } in runs {
        records.runs.push(run_record(run));
        for job in jobs {
            records.jobs.push(job_record(job));
            records.steps.extend(job.steps().iter().map(|step| step_record(job.id, step)));
        }
    }
    records
}
