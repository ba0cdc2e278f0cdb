//! File-backed shared resources confined to one configuration directory.

use crate::run::ports::{ResourceError, SharedResource};
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use std::{io::ErrorKind, sync::Arc};

/// A single file inside a capability-scoped directory.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct DirResource {
    dir: Arc<Dir>,
    file_name: String,
    temp_name: String,
    label: String,
}

impl DirResource {
    /// Opens `file_name` inside `dir_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Io`] when the directory cannot be opened.
    pub fn open(dir_path: &Utf8Path, file_name: &str) -> Result<Self, ResourceError> {
        let label = dir_path.join(file_name).into_string();
        let dir = Dir::open_ambient_dir(dir_path, ambient_authority())
            .map_err(|err| ResourceError::io(label.clone(), "open", err))?;
        Ok(Self::from_dir(Arc::new(dir), file_name, label))
    }

    /// Wraps an already opened directory.
    #[must_use]
    pub fn from_dir(dir: Arc<Dir>, file_name: &str, label: impl Into<String>) -> Self {
        Self {
            dir,
            file_name: file_name.to_owned(),
            temp_name: format!(".{file_name}.tmp"),
            label: label.into(),
        }
    }
}

impl SharedResource for DirResource {
    fn name(&self) -> &str {
        &self.label
    }

    fn load(&self) -> Result<Option<Vec<u8>>, ResourceError> {
        match self.dir.read(&self.file_name) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ResourceError::io(self.label.clone(), "read", err)),
        }
    }

    fn store(&self, content: &[u8]) -> Result<(), ResourceError> {
        self.dir
            .write(&self.temp_name, content)
            .map_err(|err| ResourceError::io(self.label.clone(), "write", err))?;
        self.dir
            .rename(&self.temp_name, &self.dir, &self.file_name)
            .map_err(|err| ResourceError::io(self.label.clone(), "rename", err))
    }

    fn remove(&self) -> Result<(), ResourceError> {
        match self.dir.remove_file(&self.file_name) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ResourceError::io(self.label.clone(), "remove", err)),
        }
    }
}
