//! When steps for watch task behaviour scenarios.

use super::world::{WatchWorld, run_async};
use rstest_bdd_macros::when;
use trendwatch::task::services::{CreateTaskRequest, UpdateTaskRequest};

#[when(r#"user "{user}" creates a task "{name}" watching "{keyword}""#)]
fn user_creates_task(world: &mut WatchWorld, user: String, name: String, keyword: String) {
    let result = run_async(
        world
            .service
            .create_task(CreateTaskRequest::new(name, user, vec![keyword])),
    );
    if let Ok(ref created) = result {
        world.last_task = Some(created.clone());
    }
    world.last_lifecycle_result = Some(result);
}

#[when(r#"user "{user}" creates a task "{name}" watching nothing"#)]
fn user_creates_task_without_keywords(world: &mut WatchWorld, user: String, name: String) {
    let result = run_async(
        world
            .service
            .create_task(CreateTaskRequest::new(name, user, Vec::new())),
    );
    world.last_lifecycle_result = Some(result);
}

#[when(r#"user "{user}" pauses the task"#)]
fn user_pauses_task(world: &mut WatchWorld, user: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id().as_str().to_owned();
    let result = run_async(
        world
            .service
            .update_task(UpdateTaskRequest::new(task_id, user).with_status("paused")),
    );
    world.last_lifecycle_result = Some(result);
    Ok(())
}

#[when("the task is run")]
fn task_is_run(world: &mut WatchWorld) -> Result<(), eyre::Report> {
    let coordinator = world.coordinator()?;
    let task_id = world.task()?.id().as_str().to_owned();
    world.last_run = Some(run_async(coordinator.execute_task(&task_id)));
    Ok(())
}
