//! Unit tests for watch task domain rules and lifecycle services.
