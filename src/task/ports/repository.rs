//! Repository port for users, tasks, and execution history.

use crate::task::domain::{
    ExecutionId, NewTaskExecution, Task, TaskExecution, TaskId, TaskPatch, TaskStatus, User,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
///
/// Implementations must not cache task state between calls: an update made
/// through one handle is visible to every other handle immediately.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts `user` unless a user with the same identifier exists, then
    /// returns the stored user.
    async fn get_or_create_user(&self, user: &User) -> TaskRepositoryResult<User>;

    /// Finds a user by identifier.
    async fn find_user(&self, id: &UserId) -> TaskRepositoryResult<Option<User>>;

    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the identifier is
    /// taken or [`TaskRepositoryError::UnknownUser`] when the owner does not
    /// exist.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Merges `patch` into the stored task and returns the result.
    ///
    /// The read and the write happen atomically, so concurrent patches that
    /// touch different fields both survive.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn apply_patch(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> TaskRepositoryResult<Task>;

    /// Finds a task by identifier.
    async fn find_by_id(&self, id: &TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Lists a user's tasks, newest first, optionally narrowed to one status.
    async fn list_by_user(
        &self,
        user_id: &UserId,
        status: Option<TaskStatus>,
    ) -> TaskRepositoryResult<Vec<Task>>;

    /// Deletes a task together with its execution history.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn delete(&self, id: &TaskId) -> TaskRepositoryResult<()>;

    /// Appends an execution record and returns its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the referenced task
    /// does not exist.
    async fn record_execution(
        &self,
        execution: &NewTaskExecution,
    ) -> TaskRepositoryResult<ExecutionId>;

    /// Lists up to `limit` executions for a task, most recent first.
    async fn list_executions(
        &self,
        task_id: &TaskId,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<TaskExecution>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The referenced user does not exist.
    #[error("user not found: {0}")]
    UnknownUser(UserId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
