//! Directory creation inside the mount.

use crate::validation::validate_dir_name;
use crate::{ExplorerError, ExplorerResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Creates directory `name` inside `parent`.
///
/// # Arguments
///
/// * `parent` - Existing directory inside the mount.
/// * `name` - User-supplied directory name, validated with [`validate_dir_name`].
///
/// # Returns
///
/// The path of the created directory.
///
/// # Errors
///
/// - `ExplorerError::InvalidName` if the name fails validation.
/// - `ExplorerError::AlreadyExists` if anything already exists at the target,
///   including when another request created it first. Nothing is overwritten.
/// - `ExplorerError::Io` for any other filesystem failure.
pub fn create_directory(parent: &Path, name: &str) -> ExplorerResult<PathBuf> {
    validate_dir_name(name)?;

    let target = parent.join(name);
    if target.exists() {
        return Err(ExplorerError::AlreadyExists { path: target });
    }

    match fs::create_dir(&target) {
        Ok(()) => Ok(target),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(ExplorerError::AlreadyExists { path: target })
        }
        Err(e) => Err(e.into()),
    }
}
