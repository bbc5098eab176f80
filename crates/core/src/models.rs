//! Flat records as they are stored, one per table.
//!
//! Timestamps are the exact strings the API returned. Nullable remote fields stay `Option` and
//! are stored as `NULL`.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct WorkflowRecord {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct RunRecord {
    pub id: u64,
    pub name: Option<String>,
    pub head_branch: Option<String>,
    pub head_sha: String,
    pub display_title: Option<String>,
    pub run_number: i64,
    pub event: String,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub workflow_id: u64,
    pub created_at: String,
    pub updated_at: String,
    pub run_attempt: Option<i64>,
    pub run_started_at: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: u64,
    pub run_id: u64,
    pub run_attempt: Option<i64>,
    pub status: String,
    pub conclusion: Option<String>,
    pub created_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct StepRecord {
    pub id: StepKey,
    pub job_id: u64,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub number: i64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Steps have no id of their own; they are identified by their job and position in it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(into = "String")]
pub struct StepKey {
    pub job_id: u64,
    pub number: i64,
}

impl StepKey {
    pub fn new(job_id: u64, number: i64) -> Self { Self { job_id, number } }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.job_id, self.number)
    }
}

impl From<StepKey> for String {
    fn from(key: StepKey) -> Self { key.to_string() }
}

/// Every record produced for one workflow's runs, in insertion order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FlatRecords {
    pub runs: Vec<RunRecord>,
    pub jobs: Vec<JobRecord>,
    pub steps: Vec<StepRecord>,
}
