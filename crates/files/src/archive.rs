//! Temporary zip archives of bucket directories
//!
//! [`build_archive`] snapshots a directory subtree into `<leaf>.zip` inside a
//! private scratch directory. The returned [`TempArchive`] owns both; dropping
//! it deletes them. Callers streaming the archive keep the guard alive inside
//! the response body so the file disappears once the body is finished or
//! abandoned.

use crate::{FilesError, ARCHIVES_FOLDER_NAME};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip archive on local disk, deleted on drop.
#[derive(Debug)]
pub struct TempArchive {
    path: PathBuf,
    scratch_dir: PathBuf,
    file_name: String,
}

impl TempArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name offered to the client, e.g. `reports.zip`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.scratch_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                "failed to remove temporary archive {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Builds a zip archive of everything below `source_dir`.
///
/// Entry names are relative to `source_dir` and use `/` separators. Directories
/// are recorded as explicit entries so empty folders survive the round trip.
/// Symbolic links are skipped.
///
/// # Arguments
///
/// * `temp_dir` - Scratch root; the archive lands in `<temp_dir>/archives/<uuid>/`
/// * `source_dir` - Directory to snapshot
///
/// # Errors
///
/// Returns `FilesError` if:
/// - `source_dir` is not a directory or has no leaf name
/// - the directory walk, a file read or the zip write fails
///
/// Any partially written archive is removed before the error is returned.
pub fn build_archive(temp_dir: &Path, source_dir: &Path) -> Result<TempArchive, FilesError> {
    if !source_dir.is_dir() {
        return Err(FilesError::InvalidPath(format!(
            "not a directory: {}",
            source_dir.display()
        )));
    }

    let leaf = source_dir
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            FilesError::InvalidPath(format!(
                "directory has no usable name: {}",
                source_dir.display()
            ))
        })?;

    let scratch_dir = temp_dir
        .join(ARCHIVES_FOLDER_NAME)
        .join(uuid::Uuid::new_v4().simple().to_string());
    fs::create_dir_all(&scratch_dir)?;

    let file_name = format!("{leaf}.zip");
    // Guard first, so the scratch dir is released on every error path below.
    let archive = TempArchive {
        path: scratch_dir.join(&file_name),
        scratch_dir,
        file_name,
    };

    write_zip(archive.path(), source_dir)?;

    Ok(archive)
}

fn write_zip(target: &Path, source_dir: &Path) -> Result<(), FilesError> {
    let file = fs::File::create(target)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    let walker = WalkDir::new(source_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            continue;
        }

        let relative = entry.path().strip_prefix(source_dir).map_err(|_| {
            FilesError::InvalidPath(format!(
                "walked outside source directory: {}",
                entry.path().display()
            ))
        })?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if file_type.is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
        } else if file_type.is_file() {
            zip.start_file(name, options)?;
            let mut source = fs::File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}
