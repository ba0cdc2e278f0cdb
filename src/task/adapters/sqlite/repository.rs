//! `SQLite` repository implementation for watch task storage.

use super::{
    models::{ExecutionRow, NewExecutionRow, TaskChangeset, TaskRow, UserRow},
    schema::{task_executions, tasks, users},
};
use crate::task::{
    domain::{
        ExecutionId, ExecutionStatus, KeywordList, NewTaskExecution, PersistedTaskData,
        ReportMode, Schedule, Task, TaskDraft, TaskExecution, TaskId, TaskName, TaskPatch,
        TaskStatus, TermList, User, UserId,
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;

/// `SQLite` connection pool type used by task adapters.
pub type TaskSqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Schema applied when the repository is opened.
const CREATE_SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-01-000000_create_watch_tables/up.sql");

/// Per-connection settings; `SQLite` scopes both pragmas to a connection.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, connection: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        connection
            .batch_execute(CONNECTION_PRAGMAS)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

/// `SQLite`-backed task repository.
///
/// Every operation checks a connection out of the pool for its own duration;
/// no task state is held between calls.
#[derive(Debug, Clone)]
pub struct SqliteTaskRepository {
    pool: TaskSqlitePool,
}

impl SqliteTaskRepository {
    /// Creates a repository from an existing pool.
    ///
    /// The schema is assumed to exist; use [`Self::open`] to create it.
    #[must_use]
    pub const fn new(pool: TaskSqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url` and applies
    /// the schema.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the pool cannot be
    /// built or the schema cannot be applied.
    pub fn open(database_url: &str) -> TaskRepositoryResult<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionPragmas))
            .build(manager)
            .map_err(TaskRepositoryError::persistence)?;
        let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
        connection
            .batch_execute(CREATE_SCHEMA_SQL)
            .map_err(TaskRepositoryError::persistence)?;
        Ok(Self::new(pool))
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn get_or_create_user(&self, user: &User) -> TaskRepositoryResult<User> {
        let new_row = to_user_row(user);
        self.run_blocking(move |connection| {
            diesel::insert_or_ignore_into(users::table)
                .values(&new_row)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            let stored = users::table
                .find(&new_row.id)
                .select(UserRow::as_select())
                .first::<UserRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            row_to_user(stored)
        })
        .await
    }

    async fn find_user(&self, id: &UserId) -> TaskRepositoryResult<Option<User>> {
        let lookup = id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = users::table
                .find(lookup)
                .select(UserRow::as_select())
                .first::<UserRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_user).transpose()
        })
        .await
    }

    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id().clone();
        let user_id = task.user_id().clone();
        let new_row = to_task_row(task)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id.clone())
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        TaskRepositoryError::UnknownUser(user_id.clone())
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn apply_patch(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> TaskRepositoryResult<Task> {
        let task_id = id.clone();
        let changes = patch.clone();

        self.run_blocking(move |connection| {
            connection.immediate_transaction(move |tx| {
                let Some(row) = tasks::table
                    .find(task_id.as_str())
                    .select(TaskRow::as_select())
                    .first::<TaskRow>(tx)
                    .optional()?
                else {
                    return Err(TaskRepositoryError::NotFound(task_id));
                };
                let mut task = row_to_task(row)?;
                task.apply_at(changes, updated_at);
                diesel::update(tasks::table.find(task_id.as_str()))
                    .set(&to_changeset(&task)?)
                    .execute(tx)?;
                Ok(task)
            })
        })
        .await
    }

    async fn find_by_id(&self, id: &TaskId) -> TaskRepositoryResult<Option<Task>> {
        let lookup = id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(lookup)
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_by_user(
        &self,
        user_id: &UserId,
        status: Option<TaskStatus>,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let owner = user_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = match status {
                Some(wanted) => tasks::table
                    .filter(tasks::user_id.eq(owner))
                    .filter(tasks::status.eq(wanted.as_str()))
                    .order((tasks::created_at.desc(), tasks::id.asc()))
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(connection),
                None => tasks::table
                    .filter(tasks::user_id.eq(owner))
                    .order((tasks::created_at.desc(), tasks::id.asc()))
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(connection),
            }
            .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn delete(&self, id: &TaskId) -> TaskRepositoryResult<()> {
        let task_id = id.clone();
        self.run_blocking(move |connection| {
            let affected = connection
                .immediate_transaction(|tx| {
                    diesel::delete(
                        task_executions::table
                            .filter(task_executions::task_id.eq(task_id.as_str())),
                    )
                    .execute(tx)?;
                    diesel::delete(tasks::table.find(task_id.as_str())).execute(tx)
                })
                .map_err(TaskRepositoryError::persistence)?;
            if affected == 0 {
                return Err(TaskRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn record_execution(
        &self,
        execution: &NewTaskExecution,
    ) -> TaskRepositoryResult<ExecutionId> {
        let task_id = execution.task_id.clone();
        let new_row = to_execution_row(execution)?;

        self.run_blocking(move |connection| {
            let id = diesel::insert_into(task_executions::table)
                .values(&new_row)
                .returning(task_executions::id)
                .get_result::<i64>(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        TaskRepositoryError::NotFound(task_id.clone())
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(ExecutionId::new(id))
        })
        .await
    }

    async fn list_executions(
        &self,
        task_id: &TaskId,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<TaskExecution>> {
        let lookup = task_id.as_str().to_owned();
        let row_limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.run_blocking(move |connection| {
            let rows = task_executions::table
                .filter(task_executions::task_id.eq(lookup))
                .order((
                    task_executions::executed_at.desc(),
                    task_executions::id.desc(),
                ))
                .limit(row_limit)
                .select(ExecutionRow::as_select())
                .load::<ExecutionRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_execution).collect()
        })
        .await
    }
}

/// Fixed-width RFC 3339 so that lexical column order equals time order.
fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(value: &str) -> TaskRepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(TaskRepositoryError::persistence)
}

fn encode_terms(terms: &[String]) -> TaskRepositoryResult<String> {
    serde_json::to_string(terms).map_err(TaskRepositoryError::persistence)
}

fn decode_terms(value: &str) -> TaskRepositoryResult<Vec<String>> {
    serde_json::from_str(value).map_err(TaskRepositoryError::persistence)
}

fn to_user_row(user: &User) -> UserRow {
    UserRow {
        id: user.id().as_str().to_owned(),
        username: user.username().to_owned(),
        email: user.email().map(str::to_owned),
        created_at: encode_timestamp(user.created_at()),
        updated_at: encode_timestamp(user.updated_at()),
    }
}

fn row_to_user(row: UserRow) -> TaskRepositoryResult<User> {
    let UserRow {
        id,
        username,
        email,
        created_at,
        updated_at,
    } = row;
    Ok(User::from_persisted(
        UserId::new(id).map_err(TaskRepositoryError::persistence)?,
        username,
        email,
        decode_timestamp(&created_at)?,
        decode_timestamp(&updated_at)?,
    ))
}

fn to_task_row(task: &Task) -> TaskRepositoryResult<TaskRow> {
    Ok(TaskRow {
        id: task.id().as_str().to_owned(),
        name: task.name().as_str().to_owned(),
        user_id: task.user_id().as_str().to_owned(),
        keywords: encode_terms(task.keywords().as_slice())?,
        filters: encode_terms(task.filters().as_slice())?,
        platforms: encode_terms(task.platforms().as_slice())?,
        report_mode: task.report_mode().as_str().to_owned(),
        schedule: task.schedule().map(|schedule| schedule.as_str().to_owned()),
        expand_keywords: task.expand_keywords(),
        status: task.status().as_str().to_owned(),
        description: task.description().map(str::to_owned),
        created_at: encode_timestamp(task.created_at()),
        updated_at: encode_timestamp(task.updated_at()),
    })
}

fn to_changeset(task: &Task) -> TaskRepositoryResult<TaskChangeset> {
    let TaskRow {
        name,
        keywords,
        filters,
        platforms,
        report_mode,
        schedule,
        expand_keywords,
        status,
        description,
        updated_at,
        ..
    } = to_task_row(task)?;
    Ok(TaskChangeset {
        name,
        keywords,
        filters,
        platforms,
        report_mode,
        schedule,
        expand_keywords,
        status,
        description,
        updated_at,
    })
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        name,
        user_id,
        keywords,
        filters,
        platforms,
        report_mode,
        schedule,
        expand_keywords,
        status,
        description,
        created_at,
        updated_at,
    } = row;

    let draft = TaskDraft {
        name: TaskName::new(name).map_err(TaskRepositoryError::persistence)?,
        keywords: KeywordList::new(decode_terms(&keywords)?)
            .map_err(TaskRepositoryError::persistence)?,
        filters: TermList::new("filters", decode_terms(&filters)?)
            .map_err(TaskRepositoryError::persistence)?,
        platforms: TermList::new("platforms", decode_terms(&platforms)?)
            .map_err(TaskRepositoryError::persistence)?,
        report_mode: ReportMode::try_from(report_mode.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        schedule: schedule
            .map(Schedule::new)
            .transpose()
            .map_err(TaskRepositoryError::persistence)?,
        expand_keywords,
        description,
    };

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::parse(id).map_err(TaskRepositoryError::persistence)?,
        user_id: UserId::new(user_id).map_err(TaskRepositoryError::persistence)?,
        draft,
        status: TaskStatus::try_from(status.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    }))
}

fn to_execution_row(execution: &NewTaskExecution) -> TaskRepositoryResult<NewExecutionRow> {
    Ok(NewExecutionRow {
        task_id: execution.task_id.as_str().to_owned(),
        html_path: execution.html_path.clone(),
        matched_count: i64::try_from(execution.matched_count)
            .map_err(TaskRepositoryError::persistence)?,
        duration_ms: i64::try_from(execution.duration_ms)
            .map_err(TaskRepositoryError::persistence)?,
        status: execution.status.as_str().to_owned(),
        error_message: execution.error_message.clone(),
        executed_at: encode_timestamp(execution.executed_at),
    })
}

fn row_to_execution(row: ExecutionRow) -> TaskRepositoryResult<TaskExecution> {
    let ExecutionRow {
        id,
        task_id,
        html_path,
        matched_count,
        duration_ms,
        status,
        error_message,
        executed_at,
    } = row;

    let record = NewTaskExecution {
        task_id: TaskId::parse(task_id).map_err(TaskRepositoryError::persistence)?,
        html_path,
        matched_count: u64::try_from(matched_count).map_err(TaskRepositoryError::persistence)?,
        duration_ms: u64::try_from(duration_ms).map_err(TaskRepositoryError::persistence)?,
        status: ExecutionStatus::try_from(status.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        error_message,
        executed_at: decode_timestamp(&executed_at)?,
    };
    Ok(record.into_recorded(ExecutionId::new(id)))
}
