//! Service orchestration for watch task lifecycle operations.

mod lifecycle;

pub use lifecycle::{
    CreateTaskRequest, DEFAULT_RECENT_EXECUTIONS, TaskDetail, TaskLifecycleError,
    TaskLifecycleResult, TaskLifecycleService, UpdateTaskRequest,
};
