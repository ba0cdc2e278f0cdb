//! Concurrent runs contending for the single run slot.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use super::helpers::{WatchStack, rendered_report, stack, words};
use futures::future::{Either, select};
use rstest::rstest;
use tokio::sync::Notify;
use trendwatch::{
    run::{
        adapters::memory::StubReportPipeline,
        domain::{AdHocRunRequest, RunResult},
        services::RunCoordinatorError,
    },
    task::{domain::Task, services::CreateTaskRequest},
};

type RunFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RunResult, RunCoordinatorError>> + Send + 'a>>;

async fn create(stack: &WatchStack, name: &str, keyword: &str) -> eyre::Result<Task> {
    Ok(stack
        .lifecycle
        .create_task(CreateTaskRequest::new(name, "u1", words(&[keyword])))
        .await?)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_task_runs_admit_exactly_one(stack: WatchStack) -> eyre::Result<()> {
    let first = create(&stack, "AI", "AI").await?;
    let second = create(&stack, "EV", "电动车").await?;
    let gate = Arc::new(Notify::new());
    let pipeline = StubReportPipeline::succeeding(rendered_report(1)).with_gate(Arc::clone(&gate));
    let coordinator = stack.coordinator(pipeline.clone());

    let first_run: RunFuture<'_> = Box::pin(coordinator.execute_task(first.id().as_str()));
    let second_run: RunFuture<'_> = Box::pin(coordinator.execute_task(second.id().as_str()));
    let (rejected, admitted) = match select(first_run, second_run).await {
        Either::Left((done, pending)) | Either::Right((done, pending)) => (done, pending),
    };

    eyre::ensure!(
        matches!(rejected, Err(RunCoordinatorError::Conflict)),
        "the run finishing first must be the rejected one, got {rejected:?}"
    );
    gate.notify_one();
    let result = admitted.await?;
    eyre::ensure!(result.success, "admitted run should succeed");
    eyre::ensure!(pipeline.runs().len() == 1, "only one run may reach the pipeline");
    eyre::ensure!(stack.documents_restored(), "documents should be restored");
    eyre::ensure!(!coordinator.slot().is_busy(), "slot should be released");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slot_is_shared_between_coordinators(stack: WatchStack) -> eyre::Result<()> {
    let task = create(&stack, "AI", "AI").await?;
    let gate = Arc::new(Notify::new());
    let gated = stack.coordinator(
        StubReportPipeline::succeeding(rendered_report(1)).with_gate(Arc::clone(&gate)),
    );
    let other = stack
        .coordinator(StubReportPipeline::succeeding(rendered_report(1)))
        .with_slot(gated.slot().clone());

    let task_run = Box::pin(gated.execute_task(task.id().as_str()));
    let ad_hoc = Box::pin(async {
        while !other.slot().is_busy() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        other
            .execute_ad_hoc(AdHocRunRequest::new(words(&["AI"])))
            .await
    });
    let (ad_hoc_result, task_run) = match select(ad_hoc, task_run).await {
        Either::Left((done, pending)) => (done, pending),
        Either::Right((_, _)) => return Err(eyre::eyre!("gated run finished before release")),
    };

    eyre::ensure!(
        matches!(ad_hoc_result, Err(RunCoordinatorError::Conflict)),
        "ad hoc run should be rejected, got {ad_hoc_result:?}"
    );
    gate.notify_one();
    task_run.await?;

    let after = other
        .execute_ad_hoc(AdHocRunRequest::new(words(&["AI"])))
        .await?;
    eyre::ensure!(after.success, "slot should be free after the first run");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandoned_run_still_restores_documents(stack: WatchStack) -> eyre::Result<()> {
    let gate = Arc::new(Notify::new());
    let pipeline = StubReportPipeline::succeeding(rendered_report(1)).with_gate(Arc::clone(&gate));
    let coordinator = stack.coordinator(pipeline.clone());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        coordinator.execute_ad_hoc(AdHocRunRequest::new(words(&["AI"]))),
    )
    .await;
    eyre::ensure!(abandoned.is_err(), "gated run should outlive the caller's deadline");
    eyre::ensure!(
        coordinator.slot().is_busy(),
        "slot should stay held while the detached run is in flight"
    );
    eyre::ensure!(
        !stack.documents_restored(),
        "documents should carry the override while the run is gated"
    );

    gate.notify_one();
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.slot().is_busy() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await?;
    eyre::ensure!(pipeline.runs().len() == 1, "the run should reach the pipeline once");
    eyre::ensure!(stack.documents_restored(), "documents should be restored");
    Ok(())
}
