//! Given steps for watch task behaviour scenarios.

use super::world::{WatchWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use trendwatch::{
    run::{
        adapters::memory::{StaticKeywordExpander, StubReportPipeline},
        ports::{ExpanderError, PipelineReport},
    },
    task::services::CreateTaskRequest,
};

#[given(r#"user "{user}" owns a task "{name}" watching "{keyword}""#)]
fn user_owns_task(
    world: &mut WatchWorld,
    user: String,
    name: String,
    keyword: String,
) -> Result<(), eyre::Report> {
    let created = run_async(
        world
            .service
            .create_task(CreateTaskRequest::new(name, user, vec![keyword])),
    )
    .wrap_err("create task for scenario setup")?;
    world.last_task = Some(created);
    Ok(())
}

#[given(r#"the expander maps "{seed}" to "{terms}""#)]
fn expander_maps(world: &mut WatchWorld, seed: String, terms: String) {
    let expansion: Vec<String> = terms
        .split(',')
        .map(|term| term.trim().to_owned())
        .collect();
    world.expander = StaticKeywordExpander::identity().with_terms(seed, expansion);
}

#[given("the expander is unavailable")]
fn expander_unavailable(world: &mut WatchWorld) {
    world.expander =
        StaticKeywordExpander::failing(ExpanderError::Transport("connection refused".to_owned()));
}

#[given(r#"the report pipeline renders "{artifact}""#)]
fn pipeline_renders(world: &mut WatchWorld, artifact: String) {
    world.use_pipeline(StubReportPipeline::succeeding(PipelineReport {
        artifact_url: Some(artifact.clone()),
        artifact_path: Some(artifact.into()),
        matched_count: Some(1),
    }));
}

#[given(r#"the report pipeline fails with "{reason}""#)]
fn pipeline_fails(world: &mut WatchWorld, reason: String) {
    world.use_pipeline(StubReportPipeline::failing(reason));
}

#[given("another run holds the run slot")]
fn another_run_holds_slot(world: &mut WatchWorld) -> Result<(), eyre::Report> {
    let permit = world
        .slot
        .try_acquire()
        .ok_or_else(|| eyre::eyre!("run slot should be free at scenario start"))?;
    world.held_permit = Some(permit);
    Ok(())
}
