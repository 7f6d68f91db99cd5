//! Constants used throughout the BucketView core crate.
//!
//! Defaults for configuration values, fixed service endpoints and display
//! formats live here so every crate agrees on them.

/// Directory under which the bucket is mounted when `MOUNT_ROOT` is unset.
pub const DEFAULT_MOUNT_ROOT: &str = "/";

/// Mount program invoked as `<program> <bucket> <mount point>`.
pub const DEFAULT_MOUNT_COMMAND: &str = "goofys";

/// Unmount program invoked as `<program...> <mount point>`.
pub const DEFAULT_UNMOUNT_COMMAND: &str = "fusermount -u";

/// Scratch space for staging files and archives.
pub const DEFAULT_TEMP_DIR: &str = "/tmp/bucketview";

/// Base URL of the internal processing service.
pub const DEFAULT_JOB_API_URL: &str = "http://api:5678";

/// Base URL of the GitHub REST API used for bug reports.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Characters a new directory name may not contain (a space is rejected too).
pub const ILLEGAL_DIR_NAME_CHARS: &str = r#"`~!@#$%^&*()=+[{]}\|:;"'<,>.?/"#;

/// Display format for modification times, e.g. `Monday October 19, 2026 03:04:05 PM`.
pub const MODIFIED_TIME_FORMAT: &str = "%A %B %d, %Y %I:%M:%S %p";
