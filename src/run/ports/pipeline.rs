//! Report pipeline port: the delegated fetch, filter, and render step.

use crate::task::domain::{ReportMode, TaskId};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Parameters handed to the report pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    /// Report cadence written to the settings document.
    pub report_mode: ReportMode,
    /// Whether a report artifact should be rendered.
    pub render_report: bool,
    /// Task being replayed, if any.
    pub task_id: Option<TaskId>,
}

/// What the pipeline reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Rendered artifact location.
    pub artifact_path: Option<Utf8PathBuf>,
    /// Artifact location relative to the pipeline root, `/`-separated.
    pub artifact_url: Option<String>,
    /// Matched item count, when the pipeline reports one.
    pub matched_count: Option<u64>,
}

/// Failures of the report pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline could not be started.
    #[error("failed to start report pipeline: {0}")]
    Spawn(#[source] std::io::Error),
    /// The pipeline exited unsuccessfully.
    #[error("report pipeline exited with {}: {stderr}", exit_code_label(*.code))]
    Exited {
        /// Exit code, when the process was not killed by a signal.
        code: Option<i32>,
        /// Trailing standard error output.
        stderr: String,
    },
    /// The pipeline reported a failure.
    #[error("report pipeline failed: {0}")]
    Failed(String),
}

fn exit_code_label(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_owned(), |value| format!("status {value}"))
}

/// Performs fetch, filter, and render against the shared configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportPipeline: Send + Sync {
    /// Runs the pipeline once.
    async fn run(&self, context: &PipelineContext) -> Result<PipelineReport, PipelineError>;
}
