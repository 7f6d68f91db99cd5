//! # BucketView Core
//!
//! Core logic for the BucketView bucket explorer.
//!
//! This crate contains the filesystem and remote operations behind every route:
//! - Keeping the bucket mounted and listing its directories
//! - Directory creation and staged uploads to the object store
//! - Operator accounts in SQLite
//! - Job dispatch, bug reports and inline file views
//!
//! **No API concerns**: sessions, HTTP routing and rendering belong in `api-shared`
//! and `api-rest`.

pub mod config;
pub mod constants;
pub mod directories;
pub mod error;
pub mod issues;
pub mod jobs;
pub mod listing;
pub mod mount;
pub mod object_store;
pub mod paths;
pub mod upload;
pub mod users;
pub mod validation;
pub mod viewer;

pub use config::{CommandLine, CoreConfig, IssueTrackerConfig};
pub use error::{ExplorerError, ExplorerResult};
pub use listing::{Entry, EntryKind};
pub use mount::{ExternalMountCommand, MountCommand, MountManager};
pub use object_store::{ObjectStore, ObjectStoreError, S3ObjectStore};
pub use paths::MountPaths;
pub use upload::{UploadOutcome, Uploader};
pub use users::{SqliteUserStore, User, UserStore};
