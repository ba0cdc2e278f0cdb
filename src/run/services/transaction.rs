//! Snapshot, override, and restore of the pipeline's shared documents.

use crate::run::{
    domain::{ExpandedKeywords, FilterDocument, SettingsError, WatchSettings},
    ports::{ResourceError, SharedResource},
};
use crate::task::domain::ReportMode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Fatal failures while rewriting or restoring shared documents.
#[derive(Debug, Error)]
pub enum ConfigTransactionError {
    /// Resource I/O failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// The settings document could not be read or written.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// A document was not valid UTF-8.
    #[error("resource {resource} is not valid UTF-8")]
    Encoding {
        /// Resource name.
        resource: String,
    },
    /// The blocking document task did not complete.
    #[error("document task failed: {0}")]
    Blocking(#[source] tokio::task::JoinError),
}

/// Exact content of both documents, taken before an override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    filter: Option<Vec<u8>>,
    settings: Option<Vec<u8>>,
}

impl ResourceSnapshot {
    /// Returns the captured filter document bytes.
    #[must_use]
    pub fn filter(&self) -> Option<&[u8]> {
        self.filter.as_deref()
    }

    /// Returns the captured settings document bytes.
    #[must_use]
    pub fn settings(&self) -> Option<&[u8]> {
        self.settings.as_deref()
    }
}

/// Parameters written into the shared documents for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunOverride<'a> {
    /// Expanded keywords written as word groups.
    pub expanded: &'a ExpandedKeywords,
    /// Global exclusion terms.
    pub filters: &'a [String],
    /// Platform scope; empty leaves the configured platforms untouched.
    pub platforms: &'a [String],
    /// Report cadence.
    pub report_mode: ReportMode,
}

/// Effect of an applied override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideSummary {
    /// Platforms in effect after narrowing.
    pub platform_count: usize,
}

/// Brackets a run with a rewrite of the filter and settings documents.
///
/// The transaction itself takes no lock; callers must hold the run slot
/// from [`Self::snapshot`] until [`Self::restore`] returns.
#[derive(Clone)]
pub struct ConfigTransaction {
    filter: Arc<dyn SharedResource>,
    settings: Arc<dyn SharedResource>,
}

impl ConfigTransaction {
    /// Creates a transaction over the two shared documents.
    #[must_use]
    pub fn new(filter: Arc<dyn SharedResource>, settings: Arc<dyn SharedResource>) -> Self {
        Self { filter, settings }
    }

    /// Runs `f` against this transaction on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or [`ConfigTransactionError::Blocking`]
    /// when `f` panicked.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, ConfigTransactionError>
    where
        F: FnOnce(&Self) -> Result<T, ConfigTransactionError> + Send + 'static,
        T: Send + 'static,
    {
        let transaction = self.clone();
        tokio::task::spawn_blocking(move || f(&transaction))
            .await
            .map_err(ConfigTransactionError::Blocking)?
    }

    /// Captures the exact bytes of both documents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigTransactionError::Resource`] when a document cannot
    /// be read.
    pub fn snapshot(&self) -> Result<ResourceSnapshot, ConfigTransactionError> {
        Ok(ResourceSnapshot {
            filter: self.filter.load()?,
            settings: self.settings.load()?,
        })
    }

    /// Rewrites both documents for one run.
    ///
    /// The filter document keeps the header of the snapshot. The settings
    /// document keeps every key except the narrowed platform list, report
    /// mode, and schedule flag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigTransactionError`] when a document cannot be parsed
    /// or written. Documents may be partially rewritten; callers must still
    /// restore.
    pub fn apply_override(
        &self,
        snapshot: &ResourceSnapshot,
        run: RunOverride<'_>,
    ) -> Result<OverrideSummary, ConfigTransactionError> {
        let existing_filter = snapshot
            .filter()
            .map(|bytes| decode(self.filter.name(), bytes))
            .transpose()?;
        let document = FilterDocument::for_run(existing_filter, run.expanded, run.filters);
        self.filter.store(document.render().as_bytes())?;

        let mut settings = match snapshot.settings() {
            Some(bytes) => WatchSettings::parse(decode(self.settings.name(), bytes)?)?,
            None => WatchSettings::default(),
        };
        let platform_count = settings.apply_run_override(run.platforms, run.report_mode);
        self.settings.store(settings.render()?.as_bytes())?;

        info!(
            platform_count,
            report_mode = run.report_mode.as_str(),
            "configuration override applied"
        );
        Ok(OverrideSummary { platform_count })
    }

    /// Writes the snapshot back to both documents.
    ///
    /// Both documents are attempted even when the first fails; a document
    /// absent at snapshot time is removed.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigTransactionError::Resource`] encountered.
    pub fn restore(&self, snapshot: &ResourceSnapshot) -> Result<(), ConfigTransactionError> {
        let filter_result = restore_one(self.filter.as_ref(), snapshot.filter());
        let settings_result = restore_one(self.settings.as_ref(), snapshot.settings());
        for (resource, result) in [
            (self.filter.name(), &filter_result),
            (self.settings.name(), &settings_result),
        ] {
            if let Err(err) = result {
                error!(resource, error = %err, "failed to restore shared resource");
            }
        }
        filter_result?;
        settings_result?;
        info!("configuration restored");
        Ok(())
    }
}

fn restore_one(resource: &dyn SharedResource, content: Option<&[u8]>) -> Result<(), ResourceError> {
    match content {
        Some(bytes) => resource.store(bytes),
        None => resource.remove(),
    }
}

fn decode<'a>(resource: &str, bytes: &'a [u8]) -> Result<&'a str, ConfigTransactionError> {
    std::str::from_utf8(bytes).map_err(|_| ConfigTransactionError::Encoding {
        resource: resource.to_owned(),
    })
}
