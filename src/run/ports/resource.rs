//! Shared resource port for documents read by the report pipeline.

use thiserror::Error;

/// I/O failure on a shared resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Reading, writing, or removing the resource failed.
    #[error("{operation} of resource {resource} failed: {source}")]
    Io {
        /// Resource name.
        resource: String,
        /// Failed operation.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Builds an I/O error for `resource`.
    #[must_use]
    pub fn io(resource: impl Into<String>, operation: &'static str, source: std::io::Error) -> Self {
        Self::Io {
            resource: resource.into(),
            operation,
            source,
        }
    }
}

/// A named byte document that may be absent.
pub trait SharedResource: Send + Sync {
    /// Human-readable resource name used in errors and logs.
    fn name(&self) -> &str;

    /// Returns the current content, or `None` when the resource is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] when the resource cannot be read.
    fn load(&self) -> Result<Option<Vec<u8>>, ResourceError>;

    /// Replaces the content.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] when the resource cannot be written.
    fn store(&self, content: &[u8]) -> Result<(), ResourceError>;

    /// Removes the resource; removing an absent resource succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] when the resource cannot be removed.
    fn remove(&self) -> Result<(), ResourceError>;
}
