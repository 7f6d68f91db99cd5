//! Upload staging area
//!
//! An upload is first written to a [`StagedFile`] and only then handed to the
//! object store. The staged copy must never outlive the request: callers remove
//! it explicitly once the remote write has been attempted, and the guard removes
//! it on drop if the request bails out earlier.

use crate::{FilesError, STAGING_FOLDER_NAME};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Directory in which uploads are staged before the remote write.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Creates the staging area below `temp_dir`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::Io` if the staging directory cannot be created.
    pub fn new(temp_dir: &Path) -> Result<Self, FilesError> {
        let root = temp_dir.join(STAGING_FOLDER_NAME);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens a new, empty staging file for `filename`.
    ///
    /// The on-disk name is prefixed with a random UUID so concurrent uploads of
    /// the same filename never share a staging file. `filename` must already be
    /// sanitized; anything containing a path separator is rejected.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidPath` for an empty or multi-component name and
    /// `FilesError::Io` if the file cannot be created.
    pub async fn create(&self, filename: &str) -> Result<StagedFile, FilesError> {
        if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
            return Err(FilesError::InvalidPath(format!(
                "staging filename must be a single component: {filename:?}"
            )));
        }

        let path = self
            .root
            .join(format!("{}-{}", uuid::Uuid::new_v4().simple(), filename));
        let file = tokio::fs::File::create(&path).await?;

        Ok(StagedFile {
            path,
            file: Some(file),
            size: 0,
            removed: false,
        })
    }
}

/// A staged upload on local disk.
///
/// Dropping the value deletes the file.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    size: u64,
    removed: bool,
}

impl StagedFile {
    /// Appends a chunk of the upload body.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), FilesError> {
        let file = self.file.as_mut().ok_or_else(|| {
            FilesError::InvalidPath(format!(
                "staging file already finished: {}",
                self.path.display()
            ))
        })?;
        file.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flushes and closes the write handle so the object store can read the file.
    pub async fn finish(&mut self) -> Result<(), FilesError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Deletes the staged file.
    ///
    /// A file that has already vanished counts as removed.
    pub fn remove(mut self) -> Result<(), FilesError> {
        self.file = None;
        self.removed = true;
        remove_if_present(&self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.file = None;
        if let Err(e) = remove_if_present(&self.path) {
            tracing::error!(
                "failed to remove staging file {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

fn remove_if_present(path: &Path) -> Result<(), FilesError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FilesError::Io(e)),
    }
}
