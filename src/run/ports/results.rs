//! Result source port for the most recent persisted result sets.

use crate::run::domain::{SourceKind, SourceResults};
use async_trait::async_trait;
use thiserror::Error;

/// Failures while loading result sets.
#[derive(Debug, Error)]
pub enum ResultSourceError {
    /// The result set could not be read.
    #[error("failed to read {kind:?} results: {source}")]
    Io {
        /// Result kind being read.
        kind: SourceKind,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The result set could not be decoded.
    #[error("failed to decode {kind:?} results: {source}")]
    Decode {
        /// Result kind being read.
        kind: SourceKind,
        /// Underlying decoding error.
        #[source]
        source: serde_json::Error,
    },
}

/// Supplies the most recent result set per source kind.
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Returns every source of `kind`; an absent result set is empty.
    async fn latest(&self, kind: SourceKind) -> Result<Vec<SourceResults>, ResultSourceError>;
}
