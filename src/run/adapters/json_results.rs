//! Result sets read from JSON snapshot files.

use crate::run::{
    domain::{SourceKind, SourceResults},
    ports::{ResultSource, ResultSourceError},
};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::io::ErrorKind;

/// Reads `ranked.json` and `feed.json` from a snapshot directory.
///
/// Each file holds a JSON array of sources. Entries whose `kind` differs
/// from the file they were read from are dropped.
#[derive(Debug, Clone)]
pub struct JsonResultSource {
    snapshot_dir: Utf8PathBuf,
}

impl JsonResultSource {
    /// Creates a source rooted at `snapshot_dir`.
    #[must_use]
    pub fn new(snapshot_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
        }
    }

    /// Returns the snapshot file for `kind`.
    #[must_use]
    pub fn snapshot_path(&self, kind: SourceKind) -> Utf8PathBuf {
        let file_name = match kind {
            SourceKind::Ranked => "ranked.json",
            SourceKind::Feed => "feed.json",
        };
        self.snapshot_dir.join(file_name)
    }
}

#[async_trait]
impl ResultSource for JsonResultSource {
    async fn latest(&self, kind: SourceKind) -> Result<Vec<SourceResults>, ResultSourceError> {
        let bytes = match tokio::fs::read(self.snapshot_path(kind)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(ResultSourceError::Io { kind, source }),
        };
        let sources: Vec<SourceResults> = serde_json::from_slice(&bytes)
            .map_err(|source| ResultSourceError::Decode { kind, source })?;
        Ok(sources
            .into_iter()
            .filter(|source| source.kind == kind)
            .collect())
    }
}
