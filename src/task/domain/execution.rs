//! Append-only execution history records.

use super::{ExecutionId, ExecutionStatus, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution record awaiting a store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaskExecution {
    /// Task the run was executed for.
    pub task_id: TaskId,
    /// Location of the produced report artifact, if any.
    pub html_path: Option<String>,
    /// Number of matched items reported by the run.
    pub matched_count: u64,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Run outcome.
    pub status: ExecutionStatus,
    /// Failure description for failed runs.
    pub error_message: Option<String>,
    /// Time the run finished.
    pub executed_at: DateTime<Utc>,
}

impl NewTaskExecution {
    /// Creates a successful execution record.
    #[must_use]
    pub const fn succeeded(task_id: TaskId, duration_ms: u64, executed_at: DateTime<Utc>) -> Self {
        Self {
            task_id,
            html_path: None,
            matched_count: 0,
            duration_ms,
            status: ExecutionStatus::Success,
            error_message: None,
            executed_at,
        }
    }

    /// Creates a failed execution record.
    #[must_use]
    pub fn failed(
        task_id: TaskId,
        duration_ms: u64,
        error_message: impl Into<String>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            html_path: None,
            matched_count: 0,
            duration_ms,
            status: ExecutionStatus::Failed,
            error_message: Some(error_message.into()),
            executed_at,
        }
    }

    /// Sets the artifact location.
    #[must_use]
    pub fn with_html_path(mut self, html_path: impl Into<String>) -> Self {
        self.html_path = Some(html_path.into());
        self
    }

    /// Sets the matched item count.
    #[must_use]
    pub const fn with_matched_count(mut self, matched_count: u64) -> Self {
        self.matched_count = matched_count;
        self
    }

    /// Attaches the store-assigned identifier.
    #[must_use]
    pub fn into_recorded(self, id: ExecutionId) -> TaskExecution {
        TaskExecution { id, record: self }
    }
}

/// Immutable execution record read back from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExecution {
    id: ExecutionId,
    #[serde(flatten)]
    record: NewTaskExecution,
}

impl TaskExecution {
    /// Returns the store-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> ExecutionId {
        self.id
    }

    /// Returns the task the run was executed for.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        &self.record.task_id
    }

    /// Returns the artifact location, if any.
    #[must_use]
    pub fn html_path(&self) -> Option<&str> {
        self.record.html_path.as_deref()
    }

    /// Returns the matched item count.
    #[must_use]
    pub const fn matched_count(&self) -> u64 {
        self.record.matched_count
    }

    /// Returns the run duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.record.duration_ms
    }

    /// Returns the run outcome.
    #[must_use]
    pub const fn status(&self) -> ExecutionStatus {
        self.record.status
    }

    /// Returns the failure description, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.record.error_message.as_deref()
    }

    /// Returns the time the run finished.
    #[must_use]
    pub const fn executed_at(&self) -> DateTime<Utc> {
        self.record.executed_at
    }
}
