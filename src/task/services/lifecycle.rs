//! Service layer for watch task creation, lookup, update, and history.

use crate::task::{
    domain::{
        ExecutionId, KeywordList, NewTaskExecution, ReportMode, Schedule, Task, TaskDomainError,
        TaskDraft, TaskExecution, TaskId, TaskName, TaskPatch, TaskStatus, TermList,
        UnknownVariantError, User, UserId,
    },
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Number of executions returned alongside a task by default.
pub const DEFAULT_RECENT_EXECUTIONS: usize = 5;

/// Request payload for creating a watch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    name: String,
    user_id: String,
    keywords: Vec<String>,
    filters: Vec<String>,
    platforms: Vec<String>,
    report_mode: Option<String>,
    schedule: Option<String>,
    expand_keywords: bool,
    description: Option<String>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    ///
    /// Filters and platforms default to empty, the report mode to
    /// `current`, and keyword expansion to enabled.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        user_id: impl Into<String>,
        keywords: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            user_id: user_id.into(),
            keywords: keywords.into_iter().collect(),
            filters: Vec::new(),
            platforms: Vec::new(),
            report_mode: None,
            schedule: None,
            expand_keywords: true,
            description: None,
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

    /// Sets the schedule descriptor.
    #[must_use]
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// Enables or disables keyword expansion.
    #[must_use]
    pub const fn with_expand_keywords(mut self, expand_keywords: bool) -> Self {
        self.expand_keywords = expand_keywords;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn validate(self) -> TaskLifecycleResult<(UserId, TaskDraft)> {
        let user_id = UserId::new(self.user_id)?;
        let draft = TaskDraft {
            name: TaskName::new(self.name)?,
            keywords: KeywordList::new(self.keywords)?,
            filters: TermList::new("filters", self.filters)?,
            platforms: TermList::new("platforms", self.platforms)?,
            report_mode: parse_report_mode(self.report_mode.as_deref())?,
            schedule: self.schedule.map(Schedule::new).transpose()?,
            expand_keywords: self.expand_keywords,
            description: self.description,
        };
        Ok((user_id, draft))
    }
}

/// Request payload for a partial task update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    task_id: String,
    acting_user: String,
    name: Option<String>,
    keywords: Option<Vec<String>>,
    filters: Option<Vec<String>>,
    platforms: Option<Vec<String>>,
    report_mode: Option<String>,
    schedule: Option<Option<String>>,
    expand_keywords: Option<bool>,
    status: Option<String>,
    description: Option<Option<String>>,
}

impl UpdateTaskRequest {
    /// Creates an update that changes nothing but the update timestamp.
    #[must_use]
    pub fn new(task_id: impl Into<String>, acting_user: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            acting_user: acting_user.into(),
            name: None,
            keywords: None,
            filters: None,
            platforms: None,
            report_mode: None,
            schedule: None,
            expand_keywords: None,
            status: None,
            description: None,
        }
    }

    /// Replaces the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = String>) -> Self {
        self.keywords = Some(keywords.into_iter().collect());
        self
    }

    /// Replaces the exclusion filters.
    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = String>) -> Self {
        self.filters = Some(filters.into_iter().collect());
        self
    }

    /// Replaces the platform scope.
    #[must_use]
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = String>) -> Self {
        self.platforms = Some(platforms.into_iter().collect());
        self
    }

    /// Removes every exclusion filter.
    #[must_use]
    pub fn clear_filters(self) -> Self {
        self.with_filters(Vec::new())
    }

    /// Widens the platform scope to every configured platform.
    #[must_use]
    pub fn clear_platforms(self) -> Self {
        self.with_platforms(Vec::new())
    }

    /// Replaces the report mode.
    #[must_use]
    pub fn with_report_mode(mut self, report_mode: impl Into<String>) -> Self {
        self.report_mode = Some(report_mode.into());
        self
    }

    /// Replaces the schedule descriptor.
    #[must_use]
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(Some(schedule.into()));
        self
    }

    /// Clears the schedule descriptor.
    #[must_use]
    pub fn clear_schedule(mut self) -> Self {
        self.schedule = Some(None);
        self
    }

    /// Replaces the keyword expansion flag.
    #[must_use]
    pub const fn with_expand_keywords(mut self, expand_keywords: bool) -> Self {
        self.expand_keywords = Some(expand_keywords);
        self
    }

    /// Replaces the status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    /// Clears the description.
    #[must_use]
    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    fn into_patch(self) -> TaskLifecycleResult<TaskPatch> {
        Ok(TaskPatch {
            name: self.name.map(TaskName::new).transpose()?,
            keywords: self.keywords.map(KeywordList::new).transpose()?,
            filters: self
                .filters
                .map(|filters| TermList::new("filters", filters))
                .transpose()?,
            platforms: self
                .platforms
                .map(|platforms| TermList::new("platforms", platforms))
                .transpose()?,
            report_mode: self
                .report_mode
                .as_deref()
                .map(ReportMode::try_from)
                .transpose()?,
            schedule: self
                .schedule
                .map(|schedule| schedule.map(Schedule::new).transpose())
                .transpose()?,
            expand_keywords: self.expand_keywords,
            status: self
                .status
                .as_deref()
                .map(TaskStatus::try_from)
                .transpose()?,
            description: self.description,
        })
    }
}

/// A task together with its most recent executions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDetail {
    /// The task.
    pub task: Task,
    /// Most recent executions, newest first.
    pub executions: Vec<TaskExecution>,
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// An enumerated field held an unknown value.
    #[error(transparent)]
    Validation(#[from] UnknownVariantError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// The acting user does not own the task.
    #[error("user {acting_user} may not modify task {task_id}")]
    Forbidden {
        /// Task the user attempted to modify.
        task_id: TaskId,
        /// User that attempted the modification.
        acting_user: UserId,
    },
}

impl TaskLifecycleError {
    /// Returns `true` for input validation failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Domain(_) | Self::Validation(_))
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    recent_executions: usize,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            recent_executions: DEFAULT_RECENT_EXECUTIONS,
        }
    }

    /// Sets how many executions [`Self::get_task`] returns.
    #[must_use]
    pub const fn with_recent_executions(mut self, limit: usize) -> Self {
        self.recent_executions = limit;
        self
    }

    async fn find_task_or_error(&self, task_id: &TaskId) -> TaskLifecycleResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| TaskLifecycleError::NotFound(task_id.clone()))
    }

    async fn find_owned_task(&self, task_id: &TaskId, acting_user: &UserId) -> TaskLifecycleResult<Task> {
        let task = self.find_task_or_error(task_id).await?;
        if !task.is_owned_by(acting_user) {
            return Err(TaskLifecycleError::Forbidden {
                task_id: task_id.clone(),
                acting_user: acting_user.clone(),
            });
        }
        Ok(task)
    }

    /// Returns the user with `user_id`, creating it on first reference.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the identifier is blank or the
    /// repository fails.
    pub async fn ensure_user(&self, user_id: &str) -> TaskLifecycleResult<User> {
        let id = UserId::new(user_id)?;
        let user = User::new(id, &*self.clock);
        Ok(self.repository.get_or_create_user(&user).await?)
    }

    /// Creates a new active task.
    ///
    /// Every field is validated before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] or
    /// [`TaskLifecycleError::Validation`] for invalid input, or
    /// [`TaskLifecycleError::Repository`] when persistence fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let (user_id, draft) = request.validate()?;
        self.repository
            .get_or_create_user(&User::new(user_id.clone(), &*self.clock))
            .await?;
        let task = Task::create(user_id, draft, &*self.clock);
        self.repository.store(&task).await?;
        info!(task_id = %task.id(), user_id = %task.user_id(), "task created");
        Ok(task)
    }

    /// Retrieves a task together with its most recent executions.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task does not
    /// exist.
    pub async fn get_task(&self, task_id: &str) -> TaskLifecycleResult<TaskDetail> {
        let id = TaskId::parse(task_id)?;
        let task = self.find_task_or_error(&id).await?;
        let executions = self
            .repository
            .list_executions(&id, self.recent_executions)
            .await?;
        Ok(TaskDetail { task, executions })
    }

    /// Lists a user's tasks, newest first.
    ///
    /// The user is created if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Validation`] for an unknown status, or
    /// repository errors.
    pub async fn list_tasks(
        &self,
        user_id: &str,
        status: Option<&str>,
    ) -> TaskLifecycleResult<Vec<Task>> {
        let wanted = status.map(TaskStatus::try_from).transpose()?;
        let user = self.ensure_user(user_id).await?;
        Ok(self.repository.list_by_user(user.id(), wanted).await?)
    }

    /// Applies a partial update on behalf of `acting_user`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task does not
    /// exist, [`TaskLifecycleError::Forbidden`] when the acting user is not
    /// the owner, or a validation error for invalid fields. No change is
    /// written in any of these cases.
    pub async fn update_task(&self, request: UpdateTaskRequest) -> TaskLifecycleResult<Task> {
        let task_id = TaskId::parse(request.task_id.as_str())?;
        let acting_user = UserId::new(request.acting_user.as_str())?;
        self.find_owned_task(&task_id, &acting_user).await?;
        let patch = request.into_patch()?;
        let task = self
            .repository
            .apply_patch(&task_id, &patch, self.clock.utc())
            .await
            .map_err(|err| match err {
                TaskRepositoryError::NotFound(id) => TaskLifecycleError::NotFound(id),
                other => TaskLifecycleError::Repository(other),
            })?;
        info!(task_id = %task_id, "task updated");
        Ok(task)
    }

    /// Deletes a task and its history on behalf of `acting_user`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] or
    /// [`TaskLifecycleError::Forbidden`] as for updates.
    pub async fn delete_task(&self, task_id: &str, acting_user: &str) -> TaskLifecycleResult<()> {
        let id = TaskId::parse(task_id)?;
        let user = UserId::new(acting_user)?;
        self.find_owned_task(&id, &user).await?;
        self.repository.delete(&id).await?;
        info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Appends an execution record to a task's history.
    ///
    /// # Errors
    ///
    /// Returns repository errors, including `NotFound` for unknown tasks.
    pub async fn record_execution(
        &self,
        execution: &NewTaskExecution,
    ) -> TaskLifecycleResult<ExecutionId> {
        Ok(self.repository.record_execution(execution).await?)
    }

    /// Lists up to `limit` executions of a task, newest first.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn list_executions(
        &self,
        task_id: &str,
        limit: usize,
    ) -> TaskLifecycleResult<Vec<TaskExecution>> {
        let id = TaskId::parse(task_id)?;
        Ok(self.repository.list_executions(&id, limit).await?)
    }
}

fn parse_report_mode(value: Option<&str>) -> Result<ReportMode, UnknownVariantError> {
    value.map_or(Ok(ReportMode::default()), ReportMode::try_from)
}
