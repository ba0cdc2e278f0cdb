//! Summaries returned to run callers.

use super::{ExpandedKeywords, MatchedItem};
use crate::task::domain::TaskId;
use serde::Serialize;

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Platforms in effect, or result sources consulted for link lists.
    pub platform_count: usize,
    /// Matched items.
    pub matched_count: u64,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// A rendered report.
    Artifact {
        /// Location of the artifact.
        artifact_path: String,
        /// Artifact location relative to the pipeline root.
        artifact_url: String,
    },
    /// Matched links in ranked order.
    Links {
        /// Ranked matches.
        matched_items: Vec<MatchedItem>,
    },
    /// Nothing usable was produced.
    Failed,
}

/// Summary of one accepted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Whether the run succeeded.
    pub success: bool,
    /// Wall-clock duration.
    pub duration_ms: u64,
    /// Task the run replayed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Keywords the run searched for.
    pub keywords: ExpandedKeywords,
    /// Run product.
    pub outcome: RunOutcome,
    /// Counters.
    pub stats: RunStats,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RunResult {
    /// Returns the artifact location for artifact runs.
    #[must_use]
    pub fn artifact_path(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Artifact { artifact_path, .. } => Some(artifact_path),
            RunOutcome::Links { .. } | RunOutcome::Failed => None,
        }
    }

    /// Returns the matched items for link-list runs.
    #[must_use]
    pub fn matched_items(&self) -> &[MatchedItem] {
        match &self.outcome {
            RunOutcome::Links { matched_items } => matched_items,
            RunOutcome::Artifact { .. } | RunOutcome::Failed => &[],
        }
    }
}
