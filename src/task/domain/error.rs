//! Error types for task domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// The keyword sequence contains no entries.
    #[error("keywords must be a non-empty list")]
    EmptyKeywords,

    /// A keyword, filter, or platform entry is blank.
    #[error("{field} entries must not be blank")]
    BlankEntry {
        /// Name of the sequence that contained the blank entry.
        field: &'static str,
    },

    /// The user identifier is empty after trimming.
    #[error("user id must not be empty")]
    EmptyUserId,

    /// The task identifier is empty after trimming.
    #[error("task id must not be empty")]
    EmptyTaskId,

    /// The schedule descriptor is empty after trimming.
    #[error("schedule must not be blank when supplied")]
    EmptySchedule,
}

/// Error returned while parsing enumerated task fields from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {field}: {value}")]
pub struct UnknownVariantError {
    /// Field being parsed, such as `report_mode`.
    pub field: &'static str,
    /// Rejected input value.
    pub value: String,
}

impl UnknownVariantError {
    pub(crate) fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_owned(),
        }
    }
}
