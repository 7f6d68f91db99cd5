//! BucketView scratch files
//!
//! This crate owns every file BucketView writes outside the mounted bucket:
//!
//! - **Staging files**: local copies of uploads, kept only for the duration of the
//!   remote write to the object store.
//! - **Archives**: zip snapshots of a bucket directory, kept only while the
//!   download response is being streamed.
//!
//! Both are represented by owning guards ([`StagedFile`], [`TempArchive`]) that
//! delete their file when dropped, so cleanup happens on success, on error and
//! when a client disconnects mid-transfer.
//!
//! ```text
//! <TEMP_DIR>/
//! ├── staging/
//! │   └── <uuid>-<sanitized filename>
//! └── archives/
//!     └── <uuid>/
//!         └── <directory leaf>.zip
//! ```

mod archive;
mod constants;
mod staging;

pub use archive::{build_archive, TempArchive};
pub use constants::{ARCHIVES_FOLDER_NAME, STAGING_FOLDER_NAME};
pub use staging::{StagedFile, StagingArea};

/// Errors that can occur while managing scratch files
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Path cannot be used (missing leaf component, not a directory, ...)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the zip container failed
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Walking the source directory failed
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
