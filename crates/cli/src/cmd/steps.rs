use anyhow::{Context, Result};
use gha_stats_core::config::Config;
use gha_stats_github::{GitHub, sync::SyncOptions, timings::write_step_timings};
use octocrab::models::WorkflowId;

pub async fn run(config: &Config, github: &GitHub, workflow: Option<WorkflowId>) -> Result<()> {
    let options = SyncOptions { workflow, concurrency: config.sync.concurrency() };
    let rows = write_step_timings(github, &options, std::io::stdout().lock())
        .await
        .with_context(|| {
            format!("Failed to report step timings of {}/{}", github.owner, github.repo)
        })?;
    tracing::info!("Wrote {} step rows", rows);
    Ok(())
}
