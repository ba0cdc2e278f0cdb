//! Watch tasks from creation through runs to deletion.

use std::sync::Arc;

use super::helpers::{WatchStack, rendered_report, stack, words};
use rstest::rstest;
use trendwatch::{
    run::{
        adapters::memory::StubReportPipeline, ports::SharedResource,
        services::RunCoordinatorError,
    },
    task::{
        domain::{ExecutionStatus, TaskStatus},
        services::{CreateTaskRequest, TaskLifecycleError, UpdateTaskRequest},
    },
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn apple_watch_task_runs_and_records_history(stack: WatchStack) -> eyre::Result<()> {
    let created = stack
        .lifecycle
        .create_task(CreateTaskRequest::new("Apple Watch", "u1", words(&["苹果"])))
        .await?;
    eyre::ensure!(created.id().as_str().starts_with("task_"), "unexpected id");
    eyre::ensure!(created.status() == TaskStatus::Active, "task should be active");

    let filter: Arc<dyn SharedResource> = Arc::new(stack.filter.clone());
    let pipeline = StubReportPipeline::succeeding(rendered_report(3)).observing(filter);
    let coordinator = stack.coordinator(pipeline.clone());
    let result = coordinator.execute_task(created.id().as_str()).await?;

    eyre::ensure!(result.success, "run should succeed: {:?}", result.detail);
    eyre::ensure!(
        result.artifact_path() == Some("output/html/latest/current.html"),
        "artifact path should be reported"
    );
    eyre::ensure!(stack.documents_restored(), "documents should be restored");

    let observed = pipeline.runs();
    let during_run = observed
        .first()
        .and_then(|run| run.resources.first().cloned().flatten())
        .map(String::from_utf8)
        .transpose()?
        .ok_or_else(|| eyre::eyre!("pipeline should see the filter document"))?;
    eyre::ensure!(
        during_run.contains(r"/苹果|\bApple\b|\biPhone\b|\bApple\s+Watch\b/ => 苹果"),
        "filter document during the run: {during_run}"
    );
    eyre::ensure!(
        during_run.starts_with("# Trend keywords"),
        "header should be kept"
    );

    let detail = stack.lifecycle.get_task(created.id().as_str()).await?;
    let execution = detail
        .executions
        .first()
        .ok_or_else(|| eyre::eyre!("one execution should be recorded"))?;
    eyre::ensure!(execution.task_id() == created.id(), "execution task mismatch");
    eyre::ensure!(
        execution.status() == ExecutionStatus::Success,
        "execution should succeed"
    );
    eyre::ensure!(execution.matched_count() == 3, "matched count should be recorded");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn updated_keywords_drive_the_next_run(stack: WatchStack) -> eyre::Result<()> {
    let created = stack
        .lifecycle
        .create_task(
            CreateTaskRequest::new("Phones", "u1", words(&["华为"])).with_expand_keywords(false),
        )
        .await?;
    stack
        .lifecycle
        .update_task(
            UpdateTaskRequest::new(created.id().as_str(), "u1")
                .with_keywords(words(&["小米", "OPPO"]))
                .with_platforms(words(&["weibo"])),
        )
        .await?;

    let filter: Arc<dyn SharedResource> = Arc::new(stack.filter.clone());
    let settings: Arc<dyn SharedResource> = Arc::new(stack.settings.clone());
    let pipeline = StubReportPipeline::succeeding(rendered_report(0))
        .observing(filter)
        .observing(settings);
    let result = stack
        .coordinator(pipeline.clone())
        .execute_task(created.id().as_str())
        .await?;

    eyre::ensure!(result.success, "run should succeed");
    eyre::ensure!(result.stats.platform_count == 1, "scope should narrow to weibo");
    let observed = pipeline.runs();
    let run = observed
        .first()
        .ok_or_else(|| eyre::eyre!("pipeline should run"))?;
    let texts: Vec<String> = run
        .resources
        .iter()
        .map(|content| String::from_utf8(content.clone().unwrap_or_default()))
        .collect::<Result<_, _>>()?;
    let [filter_text, settings_text] = texts.as_slice() else {
        return Err(eyre::eyre!("expected two observed documents"));
    };
    eyre::ensure!(
        filter_text.contains("[WORD_GROUPS]\n小米\n\nOPPO\n"),
        "filter document during the run: {filter_text}"
    );
    eyre::ensure!(!settings_text.contains("zhihu"), "zhihu should be scoped out");
    eyre::ensure!(settings_text.contains("current"), "report mode should be set");
    eyre::ensure!(stack.documents_restored(), "documents should be restored");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_task_loses_history_and_cannot_run(stack: WatchStack) -> eyre::Result<()> {
    let created = stack
        .lifecycle
        .create_task(CreateTaskRequest::new("AI", "u1", words(&["AI"])))
        .await?;
    let coordinator = stack.coordinator(StubReportPipeline::failing("crawler offline"));
    let failed = coordinator.execute_task(created.id().as_str()).await?;
    eyre::ensure!(!failed.success, "pipeline failure should fail the run");

    let denied = stack
        .lifecycle
        .delete_task(created.id().as_str(), "u2")
        .await;
    eyre::ensure!(
        matches!(denied, Err(TaskLifecycleError::Forbidden { .. })),
        "only the owner may delete, got {denied:?}"
    );
    stack
        .lifecycle
        .delete_task(created.id().as_str(), "u1")
        .await?;

    let history = stack
        .lifecycle
        .list_executions(created.id().as_str(), 10)
        .await?;
    eyre::ensure!(history.is_empty(), "history should be deleted with the task");
    let lookup = stack.lifecycle.get_task(created.id().as_str()).await;
    eyre::ensure!(
        matches!(lookup, Err(TaskLifecycleError::NotFound(_))),
        "deleted task should be not found, got {lookup:?}"
    );
    let rerun = coordinator.execute_task(created.id().as_str()).await;
    eyre::ensure!(
        matches!(rerun, Err(RunCoordinatorError::NotFound(_))),
        "deleted task should not run, got {rerun:?}"
    );
    Ok(())
}
