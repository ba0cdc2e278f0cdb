//! Domain model for watch task lifecycle management.
//!
//! Users own tasks; tasks accumulate an append-only execution history. All
//! persistence concerns live outside this module.

mod error;
mod execution;
mod ids;
mod task;
mod user;
mod values;

pub use error::{TaskDomainError, UnknownVariantError};
pub use execution::{NewTaskExecution, TaskExecution};
pub use ids::{ExecutionId, TaskId, UserId};
pub use task::{PersistedTaskData, Task, TaskDraft, TaskPatch};
pub use user::User;
pub use values::{
    ExecutionStatus, KeywordList, ReportMode, Schedule, TaskName, TaskStatus, TermList,
};
