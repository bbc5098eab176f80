use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    ActionsError, ActionsSource,
    models::{Job, RunWithJobs, Workflow},
};

/// Fetches a workflow's runs and the jobs of each run.
///
/// Job listings run concurrently, at most `concurrency` at a time. The result keeps the order
/// in which the runs were listed. If any listing fails the remaining ones are aborted and no
/// partial tree is returned.
pub async fn fetch_runs_with_jobs<S: ActionsSource>(
    source: &S,
    workflow: &Workflow,
    concurrency: usize,
) -> Result<Vec<RunWithJobs>, ActionsError> {
    let runs = source.list_runs(workflow.id).await?;
    tracing::debug!("Fetched {} runs for workflow {} ({})", runs.len(), workflow.id, workflow.name);

    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    for (index, run) in runs.iter().enumerate() {
        let sem = sem.clone();
        let source = source.clone();
        let run_id = run.id;
        set.spawn(async move {
            let _permit = sem.acquire().await.ok();
            (index, source.list_jobs(run_id).await)
        });
    }

    let mut jobs: Vec<Option<Vec<Job>>> = vec![None; runs.len()];
    while let Some(join_result) = set.join_next().await {
        let (index, result) = match join_result {
            Ok(output) => output,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        };
        match result {
            Ok(run_jobs) => {
                tracing::debug!("Run {} (jobs {})", runs[index].id, run_jobs.len());
                jobs[index] = Some(run_jobs);
            }
            Err(e) => {
                tracing::debug!(
                    "Failed to fetch jobs for run {}, aborting {} pending",
                    runs[index].id,
                    set.len()
                );
                // Dropping the set aborts the remaining fetches
                return Err(e);
            }
        }
    }

    Ok(runs
        .into_iter()
        .zip(jobs)
        .map(|(run, jobs)| RunWithJobs { run, jobs: jobs.unwrap_or_default() })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeActions, job, run, step, workflow};

    #[tokio::test]
    async fn attaches_jobs_to_runs_in_listing_order() {
        let source = FakeActions::builder()
            .workflow(workflow(1, "CI"), (10..20).map(|id| run(id, 1)).collect())
            .jobs(10, vec![job(100, 10, vec![step(1, "Checkout")])])
            .jobs(15, vec![job(150, 15, vec![]), job(151, 15, vec![])])
            .build();
        for concurrency in [1, 3, 64] {
            let runs = fetch_runs_with_jobs(&source, &workflow(1, "CI"), concurrency).await.unwrap();
            let ids = runs.iter().map(|r| r.run.id.into_inner()).collect::<Vec<_>>();
            assert_eq!(ids, (10..20).collect::<Vec<_>>());
            assert_eq!(runs[0].jobs.len(), 1);
            assert_eq!(runs[5].jobs.len(), 2);
            assert!(runs[5].jobs.iter().all(|j| j.run_id == runs[5].run.id));
            assert!(runs[1].jobs.is_empty());
        }
    }

    #[tokio::test]
    async fn workflow_without_runs() {
        let source = FakeActions::builder().workflow(workflow(1, "CI"), vec![]).build();
        let runs = fetch_runs_with_jobs(&source, &workflow(1, "CI"), 4).await.unwrap();
        assert!(runs.is_empty());
        assert_eq!(source.calls(), ["runs 1"]);
    }

    #[tokio::test]
    async fn single_failed_job_listing_fails_the_workflow() {
        let source = FakeActions::builder()
            .workflow(workflow(1, "CI"), vec![run(10, 1), run(11, 1), run(12, 1)])
            .jobs(10, vec![job(100, 10, vec![])])
            .jobs(12, vec![job(120, 12, vec![])])
            .failing_run(11)
            .build();
        let result = fetch_runs_with_jobs(&source, &workflow(1, "CI"), 2).await;
        assert!(matches!(result, Err(ActionsError::RateLimit { .. })));
    }

    #[tokio::test]
    async fn missing_workflow_is_not_found() {
        let source = FakeActions::builder().build();
        let result = fetch_runs_with_jobs(&source, &workflow(9, "Gone"), 1).await;
        assert!(matches!(result, Err(ActionsError::NotFound { .. })));
    }
}
