//! Validated run requests.

use crate::task::domain::{
    KeywordList, ReportMode, Task, TaskDomainError, TermList, UnknownVariantError,
};
use thiserror::Error;

/// What a run hands back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunOutput {
    /// Rendered report artifact.
    #[default]
    Artifact,
    /// Ranked list of matched links.
    LinkList,
}

/// Validation failures for ad hoc run requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunRequestError {
    /// A required field was missing or blank.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// An enumerated field held an unknown value.
    #[error(transparent)]
    Variant(#[from] UnknownVariantError),
}

/// Fully validated parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Seed keywords.
    pub keywords: KeywordList,
    /// Global exclusion terms.
    pub filters: TermList,
    /// Platform scope; empty means every configured platform.
    pub platforms: TermList,
    /// Report cadence.
    pub report_mode: ReportMode,
    /// Whether the keyword expander is consulted.
    pub expand_keywords: bool,
    /// Requested output.
    pub output: RunOutput,
}

impl RunRequest {
    /// Builds the request for replaying a stored task.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            keywords: task.keywords().clone(),
            filters: task.filters().clone(),
            platforms: task.platforms().clone(),
            report_mode: task.report_mode(),
            expand_keywords: task.expand_keywords(),
            output: RunOutput::Artifact,
        }
    }
}

/// Unvalidated ad hoc run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdHocRunRequest {
    keywords: Vec<String>,
    filters: Vec<String>,
    platforms: Vec<String>,
    report_mode: Option<String>,
    expand_keywords: bool,
    generate_artifact: bool,
}

impl AdHocRunRequest {
    /// Creates a request that expands keywords and renders an artifact.
    #[must_use]
    pub fn new(keywords: impl IntoIterator<Item = String>) -> Self {
        Self {
            keywords: keywords.into_iter().collect(),
            filters: Vec::new(),
            platforms: Vec::new(),
            report_mode: None,
            expand_keywords: true,
            generate_artifact: true,
        }
    }

    /// Sets exclusion filters.
    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = String>) -> Self {
        self.filters = filters.into_iter().collect();
        self
    }

    /// Sets the platform scope.
    #[must_use]
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = String>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }

    /// Sets the report mode by name.
    #[must_use]
    pub fn with_report_mode(mut self, report_mode: impl Into<String>) -> Self {
        self.report_mode = Some(report_mode.into());
        self
    }

    /// Enables or disables keyword expansion.
    #[must_use]
    pub const fn with_expand_keywords(mut self, expand_keywords: bool) -> Self {
        self.expand_keywords = expand_keywords;
        self
    }

    /// Chooses between an artifact and a link list.
    #[must_use]
    pub const fn with_generate_artifact(mut self, generate_artifact: bool) -> Self {
        self.generate_artifact = generate_artifact;
        self
    }

    /// Validates every field.
    ///
    /// # Errors
    ///
    /// Returns [`RunRequestError`] for empty keywords, blank entries, or an
    /// unknown report mode.
    pub fn validate(self) -> Result<RunRequest, RunRequestError> {
        let report_mode = match self.report_mode.as_deref() {
            Some(raw) => ReportMode::try_from(raw)?,
            None => ReportMode::default(),
        };
        Ok(RunRequest {
            keywords: KeywordList::new(self.keywords)?,
            filters: TermList::new("filters", self.filters)?,
            platforms: TermList::new("platforms", self.platforms)?,
            report_mode,
            expand_keywords: self.expand_keywords,
            output: if self.generate_artifact {
                RunOutput::Artifact
            } else {
                RunOutput::LinkList
            },
        })
    }
}
