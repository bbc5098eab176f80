mod cmd;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use argp::FromArgs;
use gha_stats_core::config::{Config, FileConfig, GitHubConfig};
use gha_stats_github::GitHub;
use octocrab::models::WorkflowId;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(FromArgs, PartialEq, Debug)]
/// Copy a repository's GitHub Actions workflow, run, job and step history into SQLite.
///
/// The API token is read from GHA_STATS_TOKEN, or GITHUB_TOKEN if that is unset.
struct TopLevel {
    #[argp(positional)]
    /// repository owner
    owner: String,
    #[argp(positional)]
    /// repository name
    repo: String,
    #[argp(option, short = 'c')]
    /// config file (default: config.yml, if present)
    config: Option<PathBuf>,
    #[argp(option)]
    /// database URL (e.g. sqlite://gha-stats.db)
    db: Option<String>,
    #[argp(option, short = 'w')]
    /// only sync the workflow with this id
    workflow: Option<u64>,
    #[argp(option)]
    /// maximum concurrent job requests
    concurrency: Option<usize>,
    #[argp(option)]
    /// runs fetched per workflow (1-100)
    per_page: Option<u8>,
    #[argp(switch)]
    /// print the repository's workflows and exit
    list_workflows: bool,
    #[argp(switch)]
    /// print one CSV row per step with its duration instead of syncing
    steps_csv: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    exit_code(run(args).await)
}

fn exit_code(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: TopLevel) -> Result<()> {
    let config = load_config(&args)?;
    let github = GitHub::new(&config.github, &args.owner, &args.repo)
        .context("Failed to create GitHub client")?
        .with_runs_per_page(config.sync.per_page());
    if args.list_workflows {
        return cmd::workflows::run(&github).await;
    }
    let workflow = args.workflow.map(WorkflowId);
    if args.steps_csv {
        return cmd::steps::run(&config, &github, workflow).await;
    }
    cmd::sync::run(&config, &github, workflow).await
}

fn load_config(args: &TopLevel) -> Result<Config> {
    let file = FileConfig::load(args.config.as_deref())?;
    let github = GitHubConfig::from_env()?;
    let mut config = Config { db: file.db, github, sync: file.sync };
    if let Some(url) = &args.db {
        config.db.url = url.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.sync.concurrency = concurrency;
    }
    if let Some(per_page) = args.per_page {
        config.sync.per_page = per_page;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use gha_stats_core::config::ConfigError;
    use gha_stats_github::{ActionsError, sync::SyncError};

    use super::*;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(Ok(())), ExitCode::SUCCESS);
        assert_eq!(exit_code(Err(ConfigError::MissingToken.into())), ExitCode::FAILURE);
        let sync_error = SyncError::Workflow {
            workflow_id: WorkflowId(2),
            name: "Release".to_string(),
            source: ActionsError::RateLimit {
                route: "/repos/foo/bar/actions/runs/21/jobs".to_string(),
                message: "API rate limit exceeded".to_string(),
            },
        };
        let error = anyhow::Error::from(sync_error).context("Failed to sync foo/bar");
        assert_eq!(exit_code(Err(error)), ExitCode::FAILURE);
    }

    #[test]
    fn steps_csv_switch() {
        let args = TopLevel::from_args(&["gha-stats"], &["foo", "bar", "--steps-csv", "-w", "7"])
            .unwrap();
        assert!(args.steps_csv);
        assert!(!args.list_workflows);
        assert_eq!(args.workflow, Some(7));
    }
}
