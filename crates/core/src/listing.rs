//! Directory listings of the mounted bucket.

use crate::constants::MODIFIED_TIME_FORMAT;
use crate::mount::{is_transient, MountManager};
use crate::paths::url_path;
use crate::{ExplorerError, ExplorerResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One child of a listed directory. Size and time are only set for files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    /// Encoded form of `path` for use in links.
    pub url_path: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub pretty_size: Option<String>,
    pub modified: Option<String>,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

const SIZE_UNITS: [(u64, &str); 6] = [
    (1 << 50, "PB"),
    (1 << 40, "TB"),
    (1 << 30, "GB"),
    (1 << 20, "MB"),
    (1 << 10, "KB"),
    (1, "bytes"),
];

/// Human-readable file size using binary units, rounded down.
///
/// `0` → `0 bytes`, `1` → `1 byte`, `1536` → `1 KB`, `1048576` → `1 MB`.
pub fn pretty_size(bytes: u64) -> String {
    let (factor, unit) = SIZE_UNITS
        .iter()
        .copied()
        .find(|(factor, _)| bytes >= *factor)
        .unwrap_or((1, "bytes"));

    let amount = bytes / factor;
    let unit = if factor == 1 && amount == 1 { "byte" } else { unit };
    format!("{amount} {unit}")
}

/// Formats a modification time in local time, e.g. `Monday October 19, 2026 03:04:05 PM`.
pub fn format_modified(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(MODIFIED_TIME_FORMAT)
        .to_string()
}

/// Reads the immediate children of `dir`, directories first, each group
/// sorted by name.
///
/// Entries that disappear between the directory read and the stat are skipped.
pub fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for child in fs::read_dir(dir)? {
        let child = child?;
        let path = child.path();
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        let name = child.file_name().to_string_lossy().into_owned();
        let url_path = url_path(&path);
        if meta.is_dir() {
            dirs.push(Entry {
                name,
                path,
                url_path,
                kind: EntryKind::Directory,
                size: None,
                pretty_size: None,
                modified: None,
            });
        } else {
            let size = meta.len();
            files.push(Entry {
                name,
                path,
                url_path,
                kind: EntryKind::File,
                size: Some(size),
                pretty_size: Some(pretty_size(size)),
                modified: meta.modified().ok().map(format_modified),
            });
        }
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));
    dirs.extend(files);
    Ok(dirs)
}

/// Lists `dir`, remounting the bucket and retrying once on a transient error.
///
/// # Errors
///
/// - `ExplorerError::NotFound` if `dir` does not exist.
/// - `ExplorerError::StaleMount` if the retry fails with a transient error too.
/// - `ExplorerError::MountFailed` if the remount itself fails.
pub fn list(mount: &MountManager, dir: &Path) -> ExplorerResult<Vec<Entry>> {
    list_with(mount, dir, read_entries)
}

fn list_with<F>(mount: &MountManager, dir: &Path, read: F) -> ExplorerResult<Vec<Entry>>
where
    F: Fn(&Path) -> io::Result<Vec<Entry>>,
{
    let not_found = || ExplorerError::NotFound {
        path: dir.to_path_buf(),
    };

    match read(dir) {
        Ok(entries) => return Ok(entries),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) if is_transient(&e) => {
            tracing::warn!("listing {} failed, remounting: {}", dir.display(), e);
        }
        Err(e) => return Err(e.into()),
    }

    mount.remount()?;

    match read(dir) {
        Ok(entries) => Ok(entries),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found()),
        Err(e) if is_transient(&e) => Err(ExplorerError::StaleMount {
            path: dir.to_path_buf(),
            source: e,
        }),
        Err(e) => Err(e.into()),
    }
}
