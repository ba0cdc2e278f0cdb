//! Shared fixtures for `SQLite` repository integration tests.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;
use tempfile::TempDir;
use trendwatch::task::{
    adapters::sqlite::SqliteTaskRepository,
    domain::{KeywordList, ReportMode, Schedule, TaskDraft, TaskName, TermList, User, UserId},
    ports::TaskRepository,
};

/// Database file inside a temporary directory that lives as long as the
/// repository.
pub struct TestDatabase {
    /// Repository under test.
    pub repository: SqliteTaskRepository,
    /// Path of the database file.
    pub path: String,
    _dir: TempDir,
}

impl TestDatabase {
    /// Opens a second repository over the same database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reopened.
    pub fn reopen(&self) -> eyre::Result<SqliteTaskRepository> {
        Ok(SqliteTaskRepository::open(&self.path)?)
    }
}

/// Provides a freshly migrated database.
///
/// # Errors
///
/// Returns an error if the temporary directory or database cannot be created.
#[fixture]
pub fn database() -> eyre::Result<TestDatabase> {
    let dir = tempfile::tempdir()?;
    let path = dir
        .path()
        .join("tasks.db")
        .to_str()
        .ok_or_else(|| eyre::eyre!("temporary path is not UTF-8"))?
        .to_owned();
    let repository = SqliteTaskRepository::open(&path)?;
    Ok(TestDatabase {
        repository,
        path,
        _dir: dir,
    })
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Returns a clock `seconds` after a fixed base instant.
    #[must_use]
    pub fn at_offset(seconds: i64) -> Self {
        let base = Utc
            .with_ymd_and_hms(2026, 10, 1, 9, 30, 0)
            .single()
            .unwrap_or_default();
        Self(base + Duration::seconds(seconds) + Duration::nanoseconds(123_456_789))
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Builds a draft with the given name and keywords.
///
/// # Errors
///
/// Returns an error if any field fails validation.
pub fn draft(name: &str, keywords: &[&str]) -> eyre::Result<TaskDraft> {
    Ok(TaskDraft {
        name: TaskName::new(name)?,
        keywords: KeywordList::new(keywords.iter().map(|keyword| (*keyword).to_owned()))?,
        filters: TermList::new("filters", vec!["广告".to_owned(), "promo".to_owned()])?,
        platforms: TermList::new("platforms", vec!["weibo".to_owned()])?,
        report_mode: ReportMode::Incremental,
        schedule: Some(Schedule::new("0 */2 * * *")?),
        expand_keywords: false,
        description: Some("watch list".to_owned()),
    })
}

/// Ensures `user_id` exists and returns its identifier.
///
/// # Errors
///
/// Returns an error if the identifier is invalid or the insert fails.
pub async fn ensure_user(
    repository: &SqliteTaskRepository,
    user_id: &str,
) -> eyre::Result<UserId> {
    let id = UserId::new(user_id)?;
    repository
        .get_or_create_user(&User::new(id.clone(), &FixedClock::at_offset(0)))
        .await?;
    Ok(id)
}
