//! `SQLite` adapters for watch task persistence.

mod models;
mod repository;
mod schema;

pub use repository::{SqliteTaskRepository, TaskSqlitePool};
