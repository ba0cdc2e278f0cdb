//! Unit tests for run orchestration, configuration override, and ranking.
