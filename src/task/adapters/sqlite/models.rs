//! Diesel row models for watch task persistence.

use super::schema::{task_executions, tasks, users};
use diesel::prelude::*;

/// Query result and insert model for user records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    /// User identifier.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Optional contact email.
    pub email: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Query result and insert model for task records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaskRow {
    /// Task identifier.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Owning user.
    pub user_id: String,
    /// JSON-encoded keywords.
    pub keywords: String,
    /// JSON-encoded filters.
    pub filters: String,
    /// JSON-encoded platform scope.
    pub platforms: String,
    /// Report cadence.
    pub report_mode: String,
    /// Schedule descriptor.
    pub schedule: Option<String>,
    /// Keyword expansion flag.
    pub expand_keywords: bool,
    /// Lifecycle status.
    pub status: String,
    /// Description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Changeset for mutable task columns.
///
/// Owner and creation time are deliberately absent.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeset {
    /// Task name.
    pub name: String,
    /// JSON-encoded keywords.
    pub keywords: String,
    /// JSON-encoded filters.
    pub filters: String,
    /// JSON-encoded platform scope.
    pub platforms: String,
    /// Report cadence.
    pub report_mode: String,
    /// Schedule descriptor.
    pub schedule: Option<String>,
    /// Keyword expansion flag.
    pub expand_keywords: bool,
    /// Lifecycle status.
    pub status: String,
    /// Description.
    pub description: Option<String>,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Query result row for execution records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_executions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExecutionRow {
    /// Store-assigned sequence.
    pub id: i64,
    /// Executed task.
    pub task_id: String,
    /// Artifact location.
    pub html_path: Option<String>,
    /// Matched item count.
    pub matched_count: i64,
    /// Run duration in milliseconds.
    pub duration_ms: i64,
    /// Run outcome.
    pub status: String,
    /// Failure description.
    pub error_message: Option<String>,
    /// Completion timestamp.
    pub executed_at: String,
}

/// Insert model for execution records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_executions)]
pub struct NewExecutionRow {
    /// Executed task.
    pub task_id: String,
    /// Artifact location.
    pub html_path: Option<String>,
    /// Matched item count.
    pub matched_count: i64,
    /// Run duration in milliseconds.
    pub duration_ms: i64,
    /// Run outcome.
    pub status: String,
    /// Failure description.
    pub error_message: Option<String>,
    /// Completion timestamp.
    pub executed_at: String,
}
