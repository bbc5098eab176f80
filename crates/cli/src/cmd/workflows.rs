use anyhow::{Context, Result};
use gha_stats_github::{ActionsSource, GitHub};

pub async fn run(github: &GitHub) -> Result<()> {
    let workflows = github
        .list_workflows()
        .await
        .with_context(|| format!("Failed to list workflows of {}/{}", github.owner, github.repo))?;
    for workflow in workflows {
        println!("{}\t{}\t{}\t{}", workflow.id, workflow.state, workflow.path, workflow.name);
    }
    Ok(())
}
