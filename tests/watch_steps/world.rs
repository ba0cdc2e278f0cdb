//! Shared world state for watch task behaviour scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use trendwatch::{
    run::{
        adapters::memory::{
            InMemoryResource, InMemoryResultSource, StaticKeywordExpander, StubReportPipeline,
        },
        domain::{RunPermit, RunResult, RunSlot},
        services::{ConfigTransaction, RunCollaborators, RunCoordinator, RunCoordinatorError},
    },
    task::{
        adapters::memory::InMemoryTaskRepository,
        domain::Task,
        services::{TaskLifecycleError, TaskLifecycleService},
    },
};

/// Filter document present before each scenario.
pub const FILTER_TEXT: &str = "# Trend keywords\n\n[GLOBAL_FILTER]\n\n[WORD_GROUPS]\n华为\n\n";

/// Settings document present before each scenario.
pub const SETTINGS_TEXT: &str =
    "[[platforms.sources]]\nid = \"weibo\"\n\n[report]\nmode = \"incremental\"\n";

/// Service type used by the BDD world.
pub type TestTaskService = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

/// Coordinator type used by the BDD world.
pub type TestCoordinator = RunCoordinator<InMemoryTaskRepository, DefaultClock>;

/// Scenario world for watch task behaviour tests.
pub struct WatchWorld {
    /// Task store shared by the service and coordinators.
    pub repository: Arc<InMemoryTaskRepository>,
    /// Task management service.
    pub service: TestTaskService,
    /// Filter document.
    pub filter: InMemoryResource,
    /// Settings document.
    pub settings: InMemoryResource,
    /// Expander used by the next run.
    pub expander: StaticKeywordExpander,
    /// Pipeline used by the next run.
    pub pipeline: Option<StubReportPipeline>,
    /// Run slot shared with every coordinator.
    pub slot: RunSlot,
    /// Permit held on behalf of a competing run.
    pub held_permit: Option<RunPermit>,
    /// Most recently created task.
    pub last_task: Option<Task>,
    /// Result of the most recent create or update.
    pub last_lifecycle_result: Option<Result<Task, TaskLifecycleError>>,
    /// Result of the most recent run.
    pub last_run: Option<Result<RunResult, RunCoordinatorError>>,
}

impl WatchWorld {
    /// Creates a world with both shared documents present.
    #[must_use]
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryTaskRepository::new());
        let service = TaskLifecycleService::new(Arc::clone(&repository), Arc::new(DefaultClock));
        Self {
            repository,
            service,
            filter: InMemoryResource::with_content("frequency_words.txt", FILTER_TEXT),
            settings: InMemoryResource::with_content("config.toml", SETTINGS_TEXT),
            expander: StaticKeywordExpander::identity(),
            pipeline: None,
            slot: RunSlot::new(),
            held_permit: None,
            last_task: None,
            last_lifecycle_result: None,
            last_run: None,
        }
    }

    /// Installs `pipeline`, observing the filter document on every run.
    pub fn use_pipeline(&mut self, pipeline: StubReportPipeline) {
        self.pipeline = Some(pipeline.observing(Arc::new(self.filter.clone())));
    }

    /// Builds a coordinator from the configured collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error when no pipeline has been configured.
    pub fn coordinator(&self) -> eyre::Result<TestCoordinator> {
        let pipeline = self
            .pipeline
            .clone()
            .ok_or_else(|| eyre::eyre!("missing report pipeline in scenario world"))?;
        let collaborators = RunCollaborators {
            expander: Arc::new(self.expander.clone()),
            pipeline: Arc::new(pipeline),
            results: Arc::new(InMemoryResultSource::default()),
            transaction: ConfigTransaction::new(
                Arc::new(self.filter.clone()),
                Arc::new(self.settings.clone()),
            ),
        };
        Ok(RunCoordinator::new(
            Arc::clone(&self.repository),
            Arc::new(DefaultClock),
            collaborators,
        )
        .with_slot(self.slot.clone()))
    }

    /// Returns the task created by an earlier step.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been created.
    pub fn task(&self) -> eyre::Result<&Task> {
        self.last_task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing created task in scenario world"))
    }
}

impl Default for WatchWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> WatchWorld {
    WatchWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
