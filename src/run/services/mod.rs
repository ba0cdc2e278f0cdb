//! Run orchestration services.

mod coordinator;
mod transaction;

pub use coordinator::{
    MISSING_ARTIFACT_REASON, RunCollaborators, RunCoordinator, RunCoordinatorError,
};
pub use transaction::{
    ConfigTransaction, ConfigTransactionError, OverrideSummary, ResourceSnapshot, RunOverride,
};
