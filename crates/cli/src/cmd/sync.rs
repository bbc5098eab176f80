use std::time::Instant;

use anyhow::{Context, Result};
use gha_stats_core::config::Config;
use gha_stats_db::{Database, Table};
use gha_stats_github::{
    ActionsSource, GitHub,
    sync::{SyncOptions, sync_repository},
};
use octocrab::models::WorkflowId;

pub async fn run(config: &Config, github: &GitHub, workflow: Option<WorkflowId>) -> Result<()> {
    let db = Database::new(&config.db).await.context("Failed to open database")?;
    let options = SyncOptions { workflow, concurrency: config.sync.concurrency() };
    let repository = format!("{}/{}", github.owner, github.repo);
    sync_into(github, db, &options, &repository).await
}

/// Syncs into `db` and closes it, whether or not the sync succeeded.
async fn sync_into<S: ActionsSource>(
    source: &S,
    db: Database,
    options: &SyncOptions,
    repository: &str,
) -> Result<()> {
    let result = sync_and_report(source, &db, options, repository).await;
    db.close().await;
    result
}

async fn sync_and_report<S: ActionsSource>(
    source: &S,
    db: &Database,
    options: &SyncOptions,
    repository: &str,
) -> Result<()> {
    let start = Instant::now();
    let summary = sync_repository(source, db, options)
        .await
        .with_context(|| format!("Failed to sync {repository}"))?;
    tracing::info!(
        "Synced {} in {}ms: {} workflows ({} new), {} runs ({} new), {} jobs ({} new), {} steps ({} new)",
        repository,
        start.elapsed().as_millis(),
        summary.workflows.fetched,
        summary.workflows.inserted,
        summary.runs.fetched,
        summary.runs.inserted,
        summary.jobs.fetched,
        summary.jobs.inserted,
        summary.steps.fetched,
        summary.steps.inserted
    );
    for table in Table::ALL {
        let count =
            db.count_rows(table).await.with_context(|| format!("Failed to count {table} rows"))?;
        tracing::debug!("{}: {} rows", table, count);
    }
    Ok(())
}
