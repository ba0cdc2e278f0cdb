//! Adapter implementations of the run ports.

pub mod chat_expander;
pub mod command_pipeline;
pub mod fs_resource;
pub mod json_results;
pub mod memory;
