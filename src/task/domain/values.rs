//! Validated scalar and sequence values carried by watch tasks.

use super::{TaskDomainError, UnknownVariantError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Report cadence requested from the report pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Snapshot of the current ranking.
    #[default]
    Current,
    /// Aggregate over the current day.
    Daily,
    /// Only items new since the previous run.
    Incremental,
}

impl ReportMode {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Daily => "daily",
            Self::Incremental => "incremental",
        }
    }
}

impl TryFrom<&str> for ReportMode {
    type Error = UnknownVariantError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "daily" => Ok(Self::Daily),
            "incremental" => Ok(Self::Incremental),
            _ => Err(UnknownVariantError::new("report_mode", value)),
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a watch task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is live.
    #[default]
    Active,
    /// Task is temporarily suspended.
    Paused,
    /// Task is retained for reference only.
    Archived,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = UnknownVariantError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "archived" => Ok(Self::Archived),
            _ => Err(UnknownVariantError::new("status", value)),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded for one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The run completed and produced its output.
    Success,
    /// The run failed.
    Failed,
}

impl ExecutionStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for ExecutionStatus {
    type Error = UnknownVariantError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(UnknownVariantError::new("execution status", value)),
        }
    }
}

/// Human-readable task name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    /// Creates a validated task name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(TaskDomainError::EmptyTaskName);
        }
        Ok(Self(raw))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque schedule descriptor attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(String);

impl Schedule {
    /// Creates a schedule descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptySchedule`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(TaskDomainError::EmptySchedule);
        }
        Ok(Self(raw))
    }

    /// Returns the descriptor as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ordered, non-empty sequence of search keywords.
///
/// Order and duplicates are preserved exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordList(Vec<String>);

impl KeywordList {
    /// Creates a validated keyword list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyKeywords`] when no keywords are given
    /// or [`TaskDomainError::BlankEntry`] when any keyword is blank.
    pub fn new(keywords: impl IntoIterator<Item = String>) -> Result<Self, TaskDomainError> {
        let collected: Vec<String> = keywords.into_iter().collect();
        if collected.is_empty() {
            return Err(TaskDomainError::EmptyKeywords);
        }
        reject_blank_entries("keywords", &collected)?;
        Ok(Self(collected))
    }

    /// Returns the keywords in their original order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for KeywordList {
    type Error = TaskDomainError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeywordList> for Vec<String> {
    fn from(value: KeywordList) -> Self {
        value.0
    }
}

/// Ordered, possibly empty sequence of filter terms or platform identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermList(Vec<String>);

impl TermList {
    /// Creates a validated term list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::BlankEntry`] when any entry is blank.
    pub fn new(
        field: &'static str,
        terms: impl IntoIterator<Item = String>,
    ) -> Result<Self, TaskDomainError> {
        let collected: Vec<String> = terms.into_iter().collect();
        reject_blank_entries(field, &collected)?;
        Ok(Self(collected))
    }

    /// Returns the terms in their original order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` when the list holds no terms.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn reject_blank_entries(field: &'static str, entries: &[String]) -> Result<(), TaskDomainError> {
    if entries.iter().any(|entry| entry.trim().is_empty()) {
        return Err(TaskDomainError::BlankEntry { field });
    }
    Ok(())
}
