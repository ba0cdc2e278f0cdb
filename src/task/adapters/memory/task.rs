//! In-memory repository for task lifecycle tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{
        ExecutionId, NewTaskExecution, Task, TaskExecution, TaskId, TaskPatch, TaskStatus, User,
        UserId,
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    users: HashMap<UserId, User>,
    tasks: HashMap<TaskId, Task>,
    executions: Vec<TaskExecution>,
    last_execution_id: i64,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn get_or_create_user(&self, user: &User) -> TaskRepositoryResult<User> {
        let mut state = self.write()?;
        let stored = state
            .users
            .entry(user.id().clone())
            .or_insert_with(|| user.clone());
        Ok(stored.clone())
    }

    async fn find_user(&self, id: &UserId) -> TaskRepositoryResult<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id().clone()));
        }
        if !state.users.contains_key(task.user_id()) {
            return Err(TaskRepositoryError::UnknownUser(task.user_id().clone()));
        }
        state.tasks.insert(task.id().clone(), task.clone());
        Ok(())
    }

    async fn apply_patch(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> TaskRepositoryResult<Task> {
        let mut state = self.write()?;
        let stored = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskRepositoryError::NotFound(id.clone()))?;
        stored.apply_at(patch.clone(), updated_at);
        Ok(stored.clone())
    }

    async fn find_by_id(&self, id: &TaskId) -> TaskRepositoryResult<Option<Task>> {
        Ok(self.read()?.tasks.get(id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &UserId,
        status: Option<TaskStatus>,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.is_owned_by(user_id))
            .filter(|task| status.is_none_or(|wanted| task.status() == wanted))
            .cloned()
            .collect();
        tasks.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| left.id().cmp(right.id()))
        });
        Ok(tasks)
    }

    async fn delete(&self, id: &TaskId) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        if state.tasks.remove(id).is_none() {
            return Err(TaskRepositoryError::NotFound(id.clone()));
        }
        state.executions.retain(|execution| execution.task_id() != id);
        Ok(())
    }

    async fn record_execution(
        &self,
        execution: &NewTaskExecution,
    ) -> TaskRepositoryResult<ExecutionId> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&execution.task_id) {
            return Err(TaskRepositoryError::NotFound(execution.task_id.clone()));
        }
        state.last_execution_id += 1;
        let id = ExecutionId::new(state.last_execution_id);
        state.executions.push(execution.clone().into_recorded(id));
        Ok(id)
    }

    async fn list_executions(
        &self,
        task_id: &TaskId,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<TaskExecution>> {
        let state = self.read()?;
        let mut executions: Vec<TaskExecution> = state
            .executions
            .iter()
            .filter(|execution| execution.task_id() == task_id)
            .cloned()
            .collect();
        executions.sort_by(|left, right| {
            right
                .executed_at()
                .cmp(&left.executed_at())
                .then_with(|| right.id().cmp(&left.id()))
        });
        executions.truncate(limit);
        Ok(executions)
    }
}
