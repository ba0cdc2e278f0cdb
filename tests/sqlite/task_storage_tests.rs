//! Task and user persistence through the `SQLite` repository.

use super::helpers::{FixedClock, TestDatabase, database, draft, ensure_user};
use mockable::Clock;
use rstest::rstest;
use trendwatch::task::{
    domain::{ReportMode, Task, TaskId, TaskName, TaskPatch, TaskStatus, User, UserId},
    ports::{TaskRepository, TaskRepositoryError},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn get_or_create_user_keeps_the_first_record(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let id = UserId::new("u1")?;
    let clock = FixedClock::at_offset(0);

    let first = db
        .repository
        .get_or_create_user(&User::new(id.clone(), &clock).with_email("u1@example.com"))
        .await?;
    let second = db
        .repository
        .get_or_create_user(&User::new(id.clone(), &clock).with_username("renamed"))
        .await?;

    eyre::ensure!(first == second, "second call should return the stored user");
    eyre::ensure!(second.username() == "u1", "username should default to the id");
    eyre::ensure!(second.email() == Some("u1@example.com"), "email should persist");
    let found = db.repository.find_user(&id).await?;
    eyre::ensure!(found.as_ref() == Some(&first), "lookup should find the user");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stored_task_round_trips_every_field(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let owner = ensure_user(&db.repository, "u1").await?;
    let task = Task::create(
        owner,
        draft("电动车 watch", &["特斯拉", "比亚迪", "Tesla Model Y"])?,
        &FixedClock::at_offset(5),
    );

    db.repository.store(&task).await?;
    let reopened = db.reopen()?;
    let found = reopened
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("stored task should be found"))?;

    eyre::ensure!(found == task, "round trip changed the task: {found:?}");
    eyre::ensure!(
        found.keywords().as_slice() == ["特斯拉", "比亚迪", "Tesla Model Y"],
        "keyword order should be preserved"
    );
    eyre::ensure!(
        found.created_at().timestamp_subsec_nanos() == 123_456_789,
        "timestamps should keep sub-second precision"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_rejects_duplicates_and_unknown_owners(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let owner = ensure_user(&db.repository, "u1").await?;
    let clock = FixedClock::at_offset(0);
    let task = Task::create(owner, draft("AI", &["AI"])?, &clock);
    db.repository.store(&task).await?;

    let duplicate = db.repository.store(&task).await;
    eyre::ensure!(
        matches!(duplicate, Err(TaskRepositoryError::DuplicateTask(ref id)) if id == task.id()),
        "expected duplicate error, got {duplicate:?}"
    );

    let orphan = Task::create(UserId::new("ghost")?, draft("AI", &["AI"])?, &clock);
    let unknown = db.repository.store(&orphan).await;
    eyre::ensure!(
        matches!(unknown, Err(TaskRepositoryError::UnknownUser(_))),
        "expected unknown user error, got {unknown:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_by_user_orders_newest_first_and_filters_status(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let owner = ensure_user(&db.repository, "u1").await?;
    let other = ensure_user(&db.repository, "u2").await?;
    let oldest = Task::create(owner.clone(), draft("oldest", &["a"])?, &FixedClock::at_offset(0));
    let middle = Task::create(owner.clone(), draft("middle", &["b"])?, &FixedClock::at_offset(60));
    let mut newest =
        Task::create(owner.clone(), draft("newest", &["c"])?, &FixedClock::at_offset(120));
    let foreign = Task::create(other, draft("foreign", &["d"])?, &FixedClock::at_offset(180));
    newest.apply(
        TaskPatch {
            status: Some(TaskStatus::Paused),
            ..TaskPatch::default()
        },
        &FixedClock::at_offset(200),
    );
    for task in [&oldest, &middle, &newest, &foreign] {
        db.repository.store(task).await?;
    }

    let all = db.repository.list_by_user(&owner, None).await?;
    let names: Vec<&str> = all.iter().map(|task| task.name().as_str()).collect();
    eyre::ensure!(
        names == ["newest", "middle", "oldest"],
        "unexpected order {names:?}"
    );

    let paused = db
        .repository
        .list_by_user(&owner, Some(TaskStatus::Paused))
        .await?;
    eyre::ensure!(
        paused.iter().map(Task::id).collect::<Vec<&TaskId>>() == [newest.id()],
        "status filter should keep only the paused task"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_is_visible_to_other_handles(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let owner = ensure_user(&db.repository, "u1").await?;
    let task = Task::create(owner, draft("AI", &["AI"])?, &FixedClock::at_offset(0));
    db.repository.store(&task).await?;
    let other_handle = db.reopen()?;

    let later = FixedClock::at_offset(30);
    let patched = db
        .repository
        .apply_patch(
            task.id(),
            &TaskPatch {
                report_mode: Some(ReportMode::Daily),
                schedule: Some(None),
                description: Some(None),
                ..TaskPatch::default()
            },
            later.utc(),
        )
        .await?;
    eyre::ensure!(
        patched.report_mode() == ReportMode::Daily,
        "merged task should be returned"
    );

    let found = other_handle
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task should exist"))?;
    eyre::ensure!(found.report_mode() == ReportMode::Daily, "mode not updated");
    eyre::ensure!(found.schedule().is_none(), "schedule not cleared");
    eyre::ensure!(found.description().is_none(), "description not cleared");
    eyre::ensure!(found.updated_at() == later.utc(), "updated_at not bumped");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_of_missing_task_is_not_found(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let owner = ensure_user(&db.repository, "u1").await?;
    let task = Task::create(owner, draft("AI", &["AI"])?, &FixedClock::at_offset(0));

    let result = db
        .repository
        .apply_patch(task.id(), &TaskPatch::default(), FixedClock::at_offset(5).utc())
        .await;

    eyre::ensure!(
        matches!(result, Err(TaskRepositoryError::NotFound(_))),
        "expected not found, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_patches_from_two_handles_both_persist(
    database: eyre::Result<TestDatabase>,
) -> eyre::Result<()> {
    let db = database?;
    let owner = ensure_user(&db.repository, "u1").await?;
    let task = Task::create(owner, draft("AI", &["AI"])?, &FixedClock::at_offset(0));
    db.repository.store(&task).await?;
    let other_handle = db.reopen()?;
    let rename = TaskPatch {
        name: Some(TaskName::new("renamed")?),
        ..TaskPatch::default()
    };
    let pause = TaskPatch {
        status: Some(TaskStatus::Paused),
        ..TaskPatch::default()
    };

    let (renamed, paused) = tokio::join!(
        db.repository
            .apply_patch(task.id(), &rename, FixedClock::at_offset(10).utc()),
        other_handle.apply_patch(task.id(), &pause, FixedClock::at_offset(20).utc()),
    );
    renamed?;
    paused?;

    let found = db
        .repository
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task should exist"))?;
    eyre::ensure!(found.name().as_str() == "renamed", "rename was lost");
    eyre::ensure!(found.status() == TaskStatus::Paused, "pause was lost");
    Ok(())
}
