//! Report pipeline run as an external command.

use crate::run::ports::{PipelineContext, PipelineError, PipelineReport, ReportPipeline};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment variable carrying the report mode.
pub const REPORT_MODE_ENV: &str = "TRENDWATCH_REPORT_MODE";
/// Environment variable set to `1` when an artifact should be rendered.
pub const RENDER_REPORT_ENV: &str = "TRENDWATCH_RENDER_REPORT";
/// Environment variable carrying the replayed task identifier.
pub const TASK_ID_ENV: &str = "TRENDWATCH_TASK_ID";

const STDERR_TAIL_CHARS: usize = 2048;

/// Command-line description of the report pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPipelineSettings {
    /// Program to execute.
    pub program: String,
    /// Program arguments.
    pub args: Vec<String>,
    /// Working directory; artifact URLs are relative to it.
    pub working_dir: Utf8PathBuf,
    /// Output directory, relative to the working directory unless absolute.
    pub output_dir: Utf8PathBuf,
    /// Standard output marker preceding the artifact path.
    pub artifact_marker: String,
}

/// Runs the report pipeline as a child process.
#[derive(Debug, Clone)]
pub struct CommandReportPipeline {
    settings: CommandPipelineSettings,
}

impl CommandReportPipeline {
    /// Creates the pipeline adapter.
    #[must_use]
    pub const fn new(settings: CommandPipelineSettings) -> Self {
        Self { settings }
    }

    fn fallback_artifact(&self, context: &PipelineContext) -> Option<Utf8PathBuf> {
        let candidate = self
            .settings
            .working_dir
            .join(&self.settings.output_dir)
            .join("html")
            .join("latest")
            .join(format!("{}.html", context.report_mode.as_str()));
        candidate.is_file().then_some(candidate)
    }

    fn artifact_url(&self, path: &Utf8Path) -> String {
        match path.strip_prefix(&self.settings.working_dir) {
            Ok(relative) => relative
                .components()
                .map(|component| component.as_str())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.as_str().replace('\\', "/"),
        }
    }

    fn resolve(&self, raw: &str) -> Utf8PathBuf {
        let path = Utf8Path::new(raw);
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.settings.working_dir.join(path)
        }
    }
}

/// Returns the path announced by the last line containing `marker`.
#[must_use]
pub fn find_marked_artifact<'a>(stdout: &'a str, marker: &str) -> Option<&'a str> {
    stdout
        .lines()
        .filter_map(|line| line.split_once(marker).map(|(_, rest)| rest.trim()))
        .rfind(|path| !path.is_empty())
}

#[async_trait]
impl ReportPipeline for CommandReportPipeline {
    async fn run(&self, context: &PipelineContext) -> Result<PipelineReport, PipelineError> {
        let mut command = Command::new(&self.settings.program);
        command
            .args(&self.settings.args)
            .current_dir(&self.settings.working_dir)
            .env(REPORT_MODE_ENV, context.report_mode.as_str())
            .env(RENDER_REPORT_ENV, if context.render_report { "1" } else { "0" })
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(task_id) = &context.task_id {
            command.env(TASK_ID_ENV, task_id.as_str());
        }

        debug!(program = %self.settings.program, "starting report pipeline");
        let output = command.output().await.map_err(PipelineError::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let skip = stderr.chars().count().saturating_sub(STDERR_TAIL_CHARS);
            return Err(PipelineError::Exited {
                code: output.status.code(),
                stderr: stderr.chars().skip(skip).collect(),
            });
        }
        if !context.render_report {
            return Ok(PipelineReport::default());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let artifact_path = find_marked_artifact(&stdout, &self.settings.artifact_marker)
            .map(|raw| self.resolve(raw))
            .or_else(|| self.fallback_artifact(context));
        if let Some(path) = &artifact_path {
            info!(artifact = %path, "report artifact located");
        }
        let artifact_url = artifact_path.as_deref().map(|path| self.artifact_url(path));
        Ok(PipelineReport {
            artifact_path,
            artifact_url,
            matched_count: None,
        })
    }
}
