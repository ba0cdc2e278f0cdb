//! Watch task aggregate root.

use super::{
    KeywordList, ReportMode, Schedule, TaskId, TaskName, TaskStatus, TermList, UserId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Validated field set for a task about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Task name.
    pub name: TaskName,
    /// Search keywords, in priority order.
    pub keywords: KeywordList,
    /// Global exclusion terms.
    pub filters: TermList,
    /// Source platform scope; empty means all platforms.
    pub platforms: TermList,
    /// Report cadence.
    pub report_mode: ReportMode,
    /// Optional schedule descriptor.
    pub schedule: Option<Schedule>,
    /// Whether keywords are expanded before a run.
    pub expand_keywords: bool,
    /// Optional free-form description.
    pub description: Option<String>,
}

/// Partial update applied to an existing task.
///
/// `None` leaves a field untouched. For optional fields the inner `Option`
/// distinguishes clearing (`Some(None)`) from replacing (`Some(Some(_))`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// Replacement name.
    pub name: Option<TaskName>,
    /// Replacement keywords.
    pub keywords: Option<KeywordList>,
    /// Replacement filters.
    pub filters: Option<TermList>,
    /// Replacement platform scope.
    pub platforms: Option<TermList>,
    /// Replacement report mode.
    pub report_mode: Option<ReportMode>,
    /// Replacement or cleared schedule.
    pub schedule: Option<Option<Schedule>>,
    /// Replacement expansion flag.
    pub expand_keywords: Option<bool>,
    /// Replacement status.
    pub status: Option<TaskStatus>,
    /// Replacement or cleared description.
    pub description: Option<Option<String>>,
}

/// Watch task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    name: TaskName,
    user_id: UserId,
    keywords: KeywordList,
    filters: TermList,
    platforms: TermList,
    report_mode: ReportMode,
    schedule: Option<Schedule>,
    expand_keywords: bool,
    status: TaskStatus,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted owner.
    pub user_id: UserId,
    /// Persisted field set.
    pub draft: TaskDraft,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new active task owned by `user_id`.
    #[must_use]
    pub fn create(user_id: UserId, draft: TaskDraft, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self::from_persisted(PersistedTaskData {
            id: TaskId::generate(),
            user_id,
            draft,
            status: TaskStatus::Active,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        let PersistedTaskData {
            id,
            user_id,
            draft,
            status,
            created_at,
            updated_at,
        } = data;
        Self {
            id,
            name: draft.name,
            user_id,
            keywords: draft.keywords,
            filters: draft.filters,
            platforms: draft.platforms,
            report_mode: draft.report_mode,
            schedule: draft.schedule,
            expand_keywords: draft.expand_keywords,
            status,
            description: draft.description,
            created_at,
            updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the task name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        &self.name
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the search keywords.
    #[must_use]
    pub const fn keywords(&self) -> &KeywordList {
        &self.keywords
    }

    /// Returns the exclusion filters.
    #[must_use]
    pub const fn filters(&self) -> &TermList {
        &self.filters
    }

    /// Returns the platform scope.
    #[must_use]
    pub const fn platforms(&self) -> &TermList {
        &self.platforms
    }

    /// Returns the report mode.
    #[must_use]
    pub const fn report_mode(&self) -> ReportMode {
        self.report_mode
    }

    /// Returns the schedule descriptor, if any.
    #[must_use]
    pub const fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Returns whether keyword expansion is enabled.
    #[must_use]
    pub const fn expand_keywords(&self) -> bool {
        self.expand_keywords
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when `user_id` owns this task.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Merges the supplied fields and bumps `updated_at`.
    ///
    /// The owner is never part of a patch.
    pub fn apply(&mut self, patch: TaskPatch, clock: &impl Clock) {
        self.apply_at(patch, clock.utc());
    }

    /// Merges the supplied fields, stamping the change with `updated_at`.
    pub fn apply_at(&mut self, patch: TaskPatch, updated_at: DateTime<Utc>) {
        let TaskPatch {
            name,
            keywords,
            filters,
            platforms,
            report_mode,
            schedule,
            expand_keywords,
            status,
            description,
        } = patch;

        replace_if_some(&mut self.name, name);
        replace_if_some(&mut self.keywords, keywords);
        replace_if_some(&mut self.filters, filters);
        replace_if_some(&mut self.platforms, platforms);
        replace_if_some(&mut self.report_mode, report_mode);
        replace_if_some(&mut self.schedule, schedule);
        replace_if_some(&mut self.expand_keywords, expand_keywords);
        replace_if_some(&mut self.status, status);
        replace_if_some(&mut self.description, description);
        self.updated_at = updated_at;
    }
}

fn replace_if_some<T>(field: &mut T, value: Option<T>) {
    if let Some(new_value) = value {
        *field = new_value;
    }
}
