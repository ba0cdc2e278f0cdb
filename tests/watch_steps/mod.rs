//! Step definitions for watch task behaviour scenarios.

pub mod given;
pub mod when;
pub mod world;
