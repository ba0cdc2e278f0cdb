//! Shared fixtures for in-memory end-to-end tests.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mockable::DefaultClock;
use rstest::fixture;
use trendwatch::{
    run::{
        adapters::memory::{
            InMemoryResource, InMemoryResultSource, StaticKeywordExpander, StubReportPipeline,
        },
        ports::PipelineReport,
        services::{ConfigTransaction, RunCollaborators, RunCoordinator},
    },
    task::{adapters::memory::InMemoryTaskRepository, services::TaskLifecycleService},
};

/// Filter document present before any run.
pub const FILTER_TEXT: &str = "# Trend keywords\n\n[GLOBAL_FILTER]\n\n[WORD_GROUPS]\n华为\n\n";

/// Settings document present before any run.
pub const SETTINGS_TEXT: &str = "\
[[platforms.sources]]
id = \"weibo\"
name = \"Weibo\"

[[platforms.sources]]
id = \"zhihu\"
name = \"Zhihu\"

[report]
mode = \"incremental\"

[schedule]
enabled = true
";

/// Lifecycle service over the in-memory repository.
pub type Lifecycle = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

/// Run coordinator over the in-memory repository.
pub type Coordinator = RunCoordinator<InMemoryTaskRepository, DefaultClock>;

/// Services and shared documents wired together.
pub struct WatchStack {
    /// Task store shared by both services.
    pub repository: Arc<InMemoryTaskRepository>,
    /// Filter document.
    pub filter: InMemoryResource,
    /// Settings document.
    pub settings: InMemoryResource,
    /// Task management service.
    pub lifecycle: Lifecycle,
}

impl WatchStack {
    /// Builds a coordinator around `pipeline`.
    #[must_use]
    pub fn coordinator(&self, pipeline: StubReportPipeline) -> Coordinator {
        let collaborators = RunCollaborators {
            expander: Arc::new(
                StaticKeywordExpander::identity().with_terms(
                    "苹果",
                    ["Apple", "iPhone", "Apple Watch"].map(str::to_owned),
                ),
            ),
            pipeline: Arc::new(pipeline),
            results: Arc::new(InMemoryResultSource::default()),
            transaction: ConfigTransaction::new(
                Arc::new(self.filter.clone()),
                Arc::new(self.settings.clone()),
            ),
        };
        RunCoordinator::new(
            Arc::clone(&self.repository),
            Arc::new(DefaultClock),
            collaborators,
        )
    }

    /// Returns `true` when both documents hold their original bytes.
    #[must_use]
    pub fn documents_restored(&self) -> bool {
        self.filter.snapshot().as_deref() == Some(FILTER_TEXT.as_bytes())
            && self.settings.snapshot().as_deref() == Some(SETTINGS_TEXT.as_bytes())
    }
}

/// Provides a fresh stack with both documents present.
#[fixture]
pub fn stack() -> WatchStack {
    let repository = Arc::new(InMemoryTaskRepository::new());
    let lifecycle = TaskLifecycleService::new(Arc::clone(&repository), Arc::new(DefaultClock));
    WatchStack {
        repository,
        filter: InMemoryResource::with_content("frequency_words.txt", FILTER_TEXT),
        settings: InMemoryResource::with_content("config.toml", SETTINGS_TEXT),
        lifecycle,
    }
}

/// Pipeline report naming a rendered artifact.
#[must_use]
pub fn rendered_report(matched_count: u64) -> PipelineReport {
    PipelineReport {
        artifact_path: Some(Utf8PathBuf::from("output/html/latest/current.html")),
        artifact_url: Some("output/html/latest/current.html".to_owned()),
        matched_count: Some(matched_count),
    }
}

/// Converts string literals into owned strings.
#[must_use]
pub fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}
