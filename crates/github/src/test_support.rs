use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use octocrab::models::{RunId, WorkflowId};
use serde_json::json;

use crate::{
    ActionsError, ActionsSource,
    models::{Job, Run, Step, Workflow},
};

pub fn workflow(id: u64, name: &str) -> Workflow {
    serde_json::from_value(json!({
        "id": id,
        "node_id": "MDg6V29ya2Zsb3cxNjEzMzU=",
        "name": name,
        "path": format!(".github/workflows/{}.yml", name.to_lowercase()),
        "state": "active",
        "created_at": "2023-03-01T10:00:00.000+09:00",
        "updated_at": "2023-03-02T11:30:00.000+09:00",
        "url": format!("https://api.github.com/repos/octo/hello/actions/workflows/{id}"),
        "html_url": "https://github.com/octo/hello/blob/main/.github/workflows/ci.yml",
        "badge_url": "https://github.com/octo/hello/workflows/CI/badge.svg"
    }))
    .unwrap()
}

pub fn run(id: u64, workflow_id: u64) -> Run {
    serde_json::from_value(json!({
        "id": id,
        "name": "CI",
        "node_id": "MDEyOldvcmtmbG93IFJ1bjI2OTI4OQ==",
        "head_branch": "main",
        "head_sha": "acb5820ced9479c074f688cc328bf03f341a511d",
        "path": ".github/workflows/ci.yml",
        "display_title": "Update README.md",
        "run_number": 562,
        "event": "push",
        "status": "completed",
        "conclusion": "success",
        "workflow_id": workflow_id,
        "created_at": "2023-03-01T10:00:00.000+09:00",
        "updated_at": "2023-03-01T10:05:00.000+09:00",
        "run_attempt": 1,
        "run_started_at": "2023-03-01T10:00:02.000+09:00",
        "html_url": format!("https://github.com/octo/hello/actions/runs/{id}")
    }))
    .unwrap()
}

pub fn job(id: u64, run_id: u64, steps: Vec<Step>) -> Job {
    serde_json::from_value(json!({
        "id": id,
        "run_id": run_id,
        "run_attempt": 1,
        "head_sha": "acb5820ced9479c074f688cc328bf03f341a511d",
        "status": "completed",
        "conclusion": "success",
        "created_at": "2023-03-01T10:00:03.000+09:00",
        "started_at": "2023-03-01T10:00:05.000+09:00",
        "completed_at": "2023-03-01T10:03:05.000+09:00",
        "name": "build",
        "steps": steps,
        "labels": ["ubuntu-latest"],
        "runner_name": "GitHub Actions 2"
    }))
    .unwrap()
}

pub fn step(number: i64, name: &str) -> Step {
    Step {
        name: name.to_string(),
        status: "completed".to_string(),
        conclusion: Some("success".to_string()),
        number,
        started_at: Some(format!("2023-03-01T10:0{number}:00.000+09:00")),
        completed_at: Some(format!("2023-03-01T10:0{number}:30.000+09:00")),
    }
}

/// In-memory Actions data. Records every call it receives.
#[derive(Clone, Default)]
pub struct FakeActions {
    inner: Arc<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    workflows: Vec<Workflow>,
    runs: HashMap<WorkflowId, Vec<Run>>,
    jobs: HashMap<RunId, Vec<Job>>,
    failing_runs: HashSet<RunId>,
    calls: Mutex<Vec<String>>,
}

impl FakeActions {
    pub fn builder() -> FakeActionsBuilder { FakeActionsBuilder::default() }

    pub fn calls(&self) -> Vec<String> { self.inner.calls.lock().unwrap().clone() }

    fn record(&self, call: String) { self.inner.calls.lock().unwrap().push(call); }
}

#[derive(Default)]
pub struct FakeActionsBuilder {
    inner: FakeInner,
}

impl FakeActionsBuilder {
    pub fn workflow(mut self, workflow: Workflow, runs: Vec<Run>) -> Self {
        self.inner.runs.insert(workflow.id, runs);
        self.inner.workflows.push(workflow);
        self
    }

    pub fn jobs(mut self, run_id: u64, jobs: Vec<Job>) -> Self {
        self.inner.jobs.insert(RunId(run_id), jobs);
        self
    }

    /// Listing the jobs of this run fails with a rate limit error.
    pub fn failing_run(mut self, run_id: u64) -> Self {
        self.inner.failing_runs.insert(RunId(run_id));
        self
    }

    pub fn build(self) -> FakeActions { FakeActions { inner: Arc::new(self.inner) } }
}

impl ActionsSource for FakeActions {
    async fn list_workflows(&self) -> Result<Vec<Workflow>, ActionsError> {
        self.record("workflows".to_string());
        Ok(self.inner.workflows.clone())
    }

    async fn list_runs(&self, workflow_id: WorkflowId) -> Result<Vec<Run>, ActionsError> {
        self.record(format!("runs {workflow_id}"));
        self.inner
            .runs
            .get(&workflow_id)
            .cloned()
            .ok_or_else(|| ActionsError::NotFound { route: format!("workflows/{workflow_id}") })
    }

    async fn list_jobs(&self, run_id: RunId) -> Result<Vec<Job>, ActionsError> {
        self.record(format!("jobs {run_id}"));
        // Let sibling fetches interleave
        tokio::task::yield_now().await;
        if self.inner.failing_runs.contains(&run_id) {
            return Err(ActionsError::RateLimit {
                route: format!("runs/{run_id}/jobs"),
                message: "API rate limit exceeded".to_string(),
            });
        }
        Ok(self.inner.jobs.get(&run_id).cloned().unwrap_or_default())
    }
}
