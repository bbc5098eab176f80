pub mod assemble;
pub mod flatten;
pub mod models;
pub mod sync;
pub mod timings;
#[cfg(test)]
mod test_support;

use gha_stats_core::config::{GitHubConfig, MAX_PER_PAGE};
use http::StatusCode;
use octocrab::{
    Octocrab,
    models::{RunId, WorkflowId},
};
use thiserror::Error;

use crate::models::{Job, JobList, Run, RunList, Workflow, WorkflowList};

#[derive(Debug, Error)]
pub enum ActionsError {
    #[error("GitHub rejected the credentials for {route}: {message}")]
    Auth { route: String, message: String },
    #[error("Not found: {route}")]
    NotFound { route: String },
    #[error("Rate limited on {route}: {message}")]
    RateLimit { route: String, message: String },
    #[error("Unexpected response body from {route}")]
    Decode {
        route: String,
        #[source]
        source: octocrab::Error,
    },
    #[error("Request to {route} failed")]
    Transport {
        route: String,
        #[source]
        source: octocrab::Error,
    },
}

/// Read access to one repository's Actions history.
///
/// Futures must be `Send` so job listings can be spread over a `JoinSet`.
pub trait ActionsSource: Clone + Send + Sync + 'static {
    /// All workflows defined in the repository.
    fn list_workflows(&self) -> impl Future<Output = Result<Vec<Workflow>, ActionsError>> + Send;

    /// The most recent runs of a workflow. Only one page is fetched; older runs are not
    /// reachable.
    fn list_runs(
        &self,
        workflow_id: WorkflowId,
    ) -> impl Future<Output = Result<Vec<Run>, ActionsError>> + Send;

    /// The jobs of a run's latest attempt.
    fn list_jobs(
        &self,
        run_id: RunId,
    ) -> impl Future<Output = Result<Vec<Job>, ActionsError>> + Send;
}

#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
    pub owner: String,
    pub repo: String,
    runs_per_page: u8,
}

/// Query for the first and only page requested from a listing.
#[derive(serde::Serialize)]
struct PageParams {
    per_page: u8,
}

impl GitHub {
    pub fn new(config: &GitHubConfig, owner: &str, repo: &str) -> Result<Self, ActionsError> {
        let client = Octocrab::builder().personal_token(config.token.clone()).build().map_err(
            |source| ActionsError::Transport { route: "client setup".to_string(), source },
        )?;
        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            runs_per_page: MAX_PER_PAGE,
        })
    }

    pub fn with_runs_per_page(mut self, per_page: u8) -> Self {
        self.runs_per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    async fn get<R>(&self, route: String, per_page: u8) -> Result<R, ActionsError>
    where R: octocrab::FromResponse {
        tracing::trace!(%route, per_page, "GET");
        self.client
            .get(&route, Some(&PageParams { per_page }))
            .await
            .map_err(|e| classify(&route, e))
    }
}

impl ActionsSource for GitHub {
    async fn list_workflows(&self) -> Result<Vec<Workflow>, ActionsError> {
        let route = format!("/repos/{}/{}/actions/workflows", self.owner, self.repo);
        let list: WorkflowList = self.get(route, MAX_PER_PAGE).await?;
        if list.total_count as usize > list.workflows.len() {
            tracing::warn!(
                "Repository has {} workflows, only the first {} are visible",
                list.total_count,
                list.workflows.len()
            );
        }
        Ok(list.workflows)
    }

    async fn list_runs(&self, workflow_id: WorkflowId) -> Result<Vec<Run>, ActionsError> {
        let route =
            format!("/repos/{}/{}/actions/workflows/{}/runs", self.owner, self.repo, workflow_id);
        let list: RunList = self.get(route, self.runs_per_page).await?;
        tracing::debug!(
            "Workflow {} has {} runs, fetched {}",
            workflow_id,
            list.total_count,
            list.workflow_runs.len()
        );
        Ok(list.workflow_runs)
    }

    async fn list_jobs(&self, run_id: RunId) -> Result<Vec<Job>, ActionsError> {
        let route = format!("/repos/{}/{}/actions/runs/{}/jobs", self.owner, self.repo, run_id);
        let list: JobList = self.get(route, MAX_PER_PAGE).await?;
        Ok(list.jobs)
    }
}

fn classify(route: &str, err: octocrab::Error) -> ActionsError {
    if let octocrab::Error::GitHub { source, .. } = &err
        && let Some(error) = status_error(route, source.status_code, &source.message)
    {
        return error;
    }
    let route = route.to_string();
    if matches!(err, octocrab::Error::Serde { .. } | octocrab::Error::Json { .. }) {
        ActionsError::Decode { route, source: err }
    } else {
        ActionsError::Transport { route, source: err }
    }
}

/// Maps an API error status to the error it signals. GitHub reports exhausted rate limits
/// as 403 as well as 429.
fn status_error(route: &str, status: StatusCode, message: &str) -> Option<ActionsError> {
    let route = route.to_string();
    let message = message.to_string();
    match status {
        StatusCode::TOO_MANY_REQUESTS => Some(ActionsError::RateLimit { route, message }),
        StatusCode::FORBIDDEN if message.to_ascii_lowercase().contains("rate limit") => {
            Some(ActionsError::RateLimit { route, message })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(ActionsError::Auth { route, message })
        }
        StatusCode::NOT_FOUND => Some(ActionsError::NotFound { route }),
        _ => None,
    }
}
