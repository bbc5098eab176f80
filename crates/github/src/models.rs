//! Typed shapes of the Actions API responses.
//!
//! Required fields are not optional, so a body of the wrong shape fails to deserialize at the
//! client instead of further down. Timestamps are kept as the strings GitHub sent.

use octocrab::models::{JobId, RunId, WorkflowId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowList {
    pub total_count: u64,
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunList {
    pub total_count: u64,
    pub workflow_runs: Vec<Run>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobList {
    pub total_count: u64,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub node_id: Option<String>,
    pub name: String,
    pub path: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub badge_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Run {
    pub id: RunId,
    pub name: Option<String>,
    pub node_id: Option<String>,
    pub head_branch: Option<String>,
    pub head_sha: String,
    pub path: Option<String>,
    pub display_title: Option<String>,
    pub run_number: i64,
    pub event: String,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub workflow_id: WorkflowId,
    pub created_at: String,
    pub updated_at: String,
    pub run_attempt: Option<i64>,
    pub run_started_at: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Job {
    pub id: JobId,
    pub run_id: RunId,
    pub run_attempt: Option<i64>,
    pub node_id: Option<String>,
    pub head_sha: Option<String>,
    pub status: String,
    pub conclusion: Option<String>,
    pub created_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub name: String,
    /// Absent for jobs that never started.
    pub steps: Option<Vec<Step>>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub runner_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    /// Position within the job, starting at 1.
    pub number: i64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl Job {
    pub fn steps(&self) -> &[Step] { self.steps.as_deref().unwrap_or_default() }
}

/// A run together with the jobs listed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunWithJobs {
    pub run: Run,
    pub jobs: Vec<Job>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserialize_job_list() {
        let list: JobList = serde_json::from_value(json!({
            "total_count": 1,
            "jobs": [{
                "id": 399444496,
                "run_id": 29679449,
                "run_attempt": 1,
                "node_id": "MDEyOldvcmtmbG93IEpvYjM5OTQ0NDQ5Ng==",
                "head_sha": "f83a356604ae3c5d03e1b46ef4d1ca77d64a90b0",
                "status": "completed",
                "conclusion": "success",
                "created_at": "2020-01-20T17:42:40Z",
                "started_at": "2020-01-20T17:42:40Z",
                "completed_at": "2020-01-20T17:44:39Z",
                "name": "build",
                "steps": [{
                    "name": "Set up job",
                    "status": "completed",
                    "conclusion": "success",
                    "number": 1,
                    "started_at": "2020-01-20T09:42:40.000-08:00",
                    "completed_at": "2020-01-20T09:42:41.000-08:00"
                }],
                "labels": ["ubuntu-latest"],
                "runner_name": null
            }]
        }))
        .unwrap();
        let job = &list.jobs[0];
        assert_eq!(job.id, JobId(399444496));
        assert_eq!(job.run_id, RunId(29679449));
        assert_eq!(job.steps().len(), 1);
        assert_eq!(job.steps()[0].started_at.as_deref(), Some("2020-01-20T09:42:40.000-08:00"));
    }

    #[test]
    fn job_without_steps() {
        let job: Job = serde_json::from_value(json!({
            "id": 1,
            "run_id": 2,
            "status": "queued",
            "conclusion": null,
            "started_at": null,
            "name": "deploy"
        }))
        .unwrap();
        assert!(job.steps.is_none());
        assert!(job.steps().is_empty());
    }

    #[test]
    fn workflow_missing_required_field() {
        let result = serde_json::from_value::<Workflow>(json!({
            "id": 161335,
            "name": "CI",
            "state": "active",
            "created_at": "2020-01-08T23:48:37.000-08:00",
            "updated_at": "2020-01-08T23:50:21.000-08:00"
        }));
        assert!(result.is_err());
    }
}
