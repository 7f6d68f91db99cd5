use crate::constants::ILLEGAL_DIR_NAME_CHARS;
use crate::object_store::ObjectStoreError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "{name} is not a valid directory name: it cannot be empty, contain a space or any of {chars}",
        chars = ILLEGAL_DIR_NAME_CHARS
    )]
    InvalidName { name: String },
    #[error("{} already exists", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("path is outside the mounted bucket: {0}")]
    PathOutsideMount(String),
    #[error("no such file or directory: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to mount bucket at {}: {reason}", mount_point.display())]
    MountFailed { mount_point: PathBuf, reason: String },
    #[error("mount is stale at {}: {source}", path.display())]
    StaleMount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read upload body: {0}")]
    UploadBody(String),
    #[error("failed to write {key} ({size} bytes) to the object store: {source}")]
    RemoteWriteFailure {
        key: String,
        size: u64,
        #[source]
        source: ObjectStoreError,
    },

    #[error("Unable to view this file type: {0}")]
    UnsupportedViewType(String),

    #[error("user {0} already exists")]
    UserExists(String),
    #[error("user {0} does not exist")]
    UserNotFound(String),
    #[error("failed to hash password: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("issue tracker error: {0}")]
    IssueTracker(String),

    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("scratch file error: {0}")]
    Files(#[from] bucketview_files::FilesError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to deserialize JSON: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize JSON: {0}")]
    Serialization(serde_json::Error),
}

pub type ExplorerResult<T> = std::result::Result<T, ExplorerError>;
