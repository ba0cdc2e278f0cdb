//! Execution history persistence through the `SQLite` repository.

use super::helpers::{FixedClock, TestDatabase, database, draft, ensure_user};
use mockable::Clock;
use rstest::rstest;
use trendwatch::task::{
    domain::{ExecutionStatus, NewTaskExecution, Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError},
};

async fn stored_task(db: &TestDatabase) -> eyre::Result<Task> {
    let owner = ensure_user(&db.repository, "u1").await?;
    let task = Task::create(owner, draft("AI", &["AI"])?, &FixedClock::at_offset(0));
    db.repository.store(&task).await?;
    Ok(task)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn executions_list_most_recent_first_with_limit(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let task = stored_task(&db).await?;
    for offset in 1..=6_u64 {
        let record = NewTaskExecution::succeeded(
            task.id().clone(),
            offset * 100,
            FixedClock::at_offset(i64::try_from(offset)?).utc(),
        )
        .with_matched_count(offset)
        .with_html_path(format!("output/html/{offset}.html"));
        db.repository.record_execution(&record).await?;
    }

    let recent = db.repository.list_executions(task.id(), 3).await?;

    let counts: Vec<u64> = recent.iter().map(|execution| execution.matched_count()).collect();
    eyre::ensure!(counts == [6, 5, 4], "unexpected order {counts:?}");
    let newest = recent
        .first()
        .ok_or_else(|| eyre::eyre!("expected executions"))?;
    eyre::ensure!(
        newest.html_path() == Some("output/html/6.html"),
        "html path should round trip"
    );
    eyre::ensure!(newest.duration_ms() == 600, "duration should round trip");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_executions_keep_their_message(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let task = stored_task(&db).await?;
    let record = NewTaskExecution::failed(
        task.id().clone(),
        42,
        "report pipeline exited with status 1",
        FixedClock::at_offset(10).utc(),
    );

    let id = db.repository.record_execution(&record).await?;
    let recorded = db.repository.list_executions(task.id(), 5).await?;

    let only = recorded
        .first()
        .ok_or_else(|| eyre::eyre!("expected one execution"))?;
    eyre::ensure!(only.id() == id, "identifier should match the insert");
    eyre::ensure!(only.status() == ExecutionStatus::Failed, "status should be failed");
    eyre::ensure!(
        only.error_message() == Some("report pipeline exited with status 1"),
        "error message should round trip"
    );
    eyre::ensure!(only.html_path().is_none(), "failed runs have no artifact");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recording_for_unknown_task_is_not_found(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let record = NewTaskExecution::succeeded(
        TaskId::generate(),
        1,
        FixedClock::at_offset(0).utc(),
    );

    let result = db.repository.record_execution(&record).await;

    eyre::ensure!(
        matches!(result, Err(TaskRepositoryError::NotFound(_))),
        "expected not found, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_cascades_history(database: eyre::Result<TestDatabase>) -> eyre::Result<()> {
    let db = database?;
    let task = stored_task(&db).await?;
    let record =
        NewTaskExecution::succeeded(task.id().clone(), 5, FixedClock::at_offset(1).utc());
    db.repository.record_execution(&record).await?;

    db.repository.delete(task.id()).await?;

    eyre::ensure!(
        db.repository.find_by_id(task.id()).await?.is_none(),
        "task should be gone"
    );
    eyre::ensure!(
        db.repository.list_executions(task.id(), 10).await?.is_empty(),
        "history should be gone"
    );
    let again = db.repository.delete(task.id()).await;
    eyre::ensure!(
        matches!(again, Err(TaskRepositoryError::NotFound(_))),
        "second delete should be not found, got {again:?}"
    );
    Ok(())
}
