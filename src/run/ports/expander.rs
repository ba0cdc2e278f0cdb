//! Keyword expansion port.

use crate::run::domain::ExpandedKeywords;
use async_trait::async_trait;
use thiserror::Error;

/// Failures of the keyword expansion provider.
///
/// Run orchestration recovers from every variant by searching for the seed
/// keywords verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpanderError {
    /// Expansion is switched off or has no credentials.
    #[error("keyword expansion is disabled")]
    Disabled,
    /// The provider could not be reached.
    #[error("expansion provider unreachable: {0}")]
    Transport(String),
    /// The provider answered with an error status.
    #[error("expansion provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// The provider's answer did not have the expected shape.
    #[error("malformed expansion response: {0}")]
    MalformedResponse(String),
    /// The provider did not answer in time.
    #[error("expansion provider timed out")]
    Timeout,
}

/// Expands seed keywords into related search terms.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeywordExpander: Send + Sync {
    /// Returns one expansion per seed, in seed order.
    async fn expand(&self, seeds: &[String]) -> Result<ExpandedKeywords, ExpanderError>;
}
