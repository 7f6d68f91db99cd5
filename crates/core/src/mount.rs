//! Bucket mount management.
//!
//! The bucket is exposed as a local directory by an external FUSE tool (goofys
//! by default). [`MountManager`] makes sure that directory is really backed by
//! the bucket and re-runs the tool when it is not. The tool itself sits behind
//! the [`MountCommand`] trait.

use crate::config::CommandLine;
use crate::{ExplorerError, ExplorerResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// Linux errno values a dead or stale FUSE mount reports.
const EIO: i32 = 5;
const ENOTCONN: i32 = 107;
const ESTALE: i32 = 116;

/// Returns true for errors that a remount may cure.
pub fn is_transient(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::NotConnected
        || matches!(error.raw_os_error(), Some(EIO | ENOTCONN | ESTALE))
}

/// The external tool that attaches and detaches the bucket.
#[cfg_attr(test, mockall::automock)]
pub trait MountCommand: Send + Sync {
    fn mount(&self, bucket: &str, mount_point: &Path) -> io::Result<()>;
    fn unmount(&self, mount_point: &Path) -> io::Result<()>;
}

/// Runs configured programs, e.g. `goofys <bucket> <path>` and `fusermount -u <path>`.
#[derive(Clone, Debug)]
pub struct ExternalMountCommand {
    mount: CommandLine,
    unmount: CommandLine,
}

impl ExternalMountCommand {
    pub fn new(mount: CommandLine, unmount: CommandLine) -> Self {
        Self { mount, unmount }
    }

    fn run(command: &CommandLine, trailing: &[&std::ffi::OsStr]) -> io::Result<()> {
        let output = Command::new(command.program())
            .args(command.args())
            .args(trailing)
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        Err(io::Error::other(format!(
            "{} exited with {}: {}",
            command.program(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

impl MountCommand for ExternalMountCommand {
    fn mount(&self, bucket: &str, mount_point: &Path) -> io::Result<()> {
        Self::run(&self.mount, &[bucket.as_ref(), mount_point.as_os_str()])
    }

    fn unmount(&self, mount_point: &Path) -> io::Result<()> {
        Self::run(&self.unmount, &[mount_point.as_os_str()])
    }
}

/// Keeps the bucket mounted at a fixed local path.
#[derive(Clone)]
pub struct MountManager {
    bucket: String,
    mount_point: PathBuf,
    command: Arc<dyn MountCommand>,
}

impl std::fmt::Debug for MountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountManager")
            .field("bucket", &self.bucket)
            .field("mount_point", &self.mount_point)
            .finish_non_exhaustive()
    }
}

impl MountManager {
    pub fn new(bucket: String, mount_point: PathBuf, command: Arc<dyn MountCommand>) -> Self {
        Self {
            bucket,
            mount_point,
            command,
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Ensures the bucket is mounted and returns the mount point.
    ///
    /// - missing mount point: create it and mount; if another process created
    ///   it first, run a full unmount/remount cycle instead
    /// - empty mount point: assume the mount is gone and mount again
    /// - unreadable mount point (dead FUSE connection): remount
    /// - non-empty mount point: nothing to do
    ///
    /// # Errors
    ///
    /// Returns `ExplorerError::MountFailed` if the mount point is unusable or the
    /// mount command fails twice in a row.
    pub fn ensure_mounted(&self) -> ExplorerResult<PathBuf> {
        match fs::metadata(&self.mount_point) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match fs::create_dir(&self.mount_point) {
                    Ok(()) => self.mount_with_retry()?,
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => self.remount()?,
                    Err(e) => return Err(self.failed(format!("cannot create mount point: {e}"))),
                }
            }
            Err(e) if is_transient(&e) => {
                tracing::warn!("mount point {} is stale: {}", self.mount_point.display(), e);
                self.remount()?;
            }
            Err(e) => return Err(self.failed(format!("cannot stat mount point: {e}"))),
            Ok(meta) if !meta.is_dir() => {
                return Err(self.failed("mount point is not a directory".into()));
            }
            Ok(_) => match fs::read_dir(&self.mount_point) {
                Ok(mut entries) => {
                    if entries.next().is_none() {
                        tracing::info!(
                            "mount point {} is empty, mounting {}",
                            self.mount_point.display(),
                            self.bucket
                        );
                        self.mount_with_retry()?;
                    }
                }
                Err(e) if is_transient(&e) => {
                    tracing::warn!("mount point {} is stale: {}", self.mount_point.display(), e);
                    self.remount()?;
                }
                Err(e) => return Err(self.failed(format!("cannot read mount point: {e}"))),
            },
        }

        Ok(self.mount_point.clone())
    }

    /// Detaches whatever is mounted and mounts the bucket again.
    ///
    /// Unmount failures are logged and ignored; there may be nothing mounted.
    pub fn remount(&self) -> ExplorerResult<()> {
        if let Err(e) = self.command.unmount(&self.mount_point) {
            tracing::warn!("unmount of {} failed: {}", self.mount_point.display(), e);
        }
        self.mount_with_retry()
    }

    fn mount_with_retry(&self) -> ExplorerResult<()> {
        let first = match self.command.mount(&self.bucket, &self.mount_point) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        tracing::warn!(
            "mounting {} at {} failed, retrying once: {}",
            self.bucket,
            self.mount_point.display(),
            first
        );
        if let Err(e) = self.command.unmount(&self.mount_point) {
            tracing::debug!("unmount before retry failed: {}", e);
        }

        self.command
            .mount(&self.bucket, &self.mount_point)
            .map_err(|e| self.failed(e.to_string()))
    }

    fn failed(&self, reason: String) -> ExplorerError {
        ExplorerError::MountFailed {
            mount_point: self.mount_point.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use tempfile::TempDir;

    fn manager(mount_point: PathBuf, command: MockMountCommand) -> MountManager {
        MountManager::new("flood-data".into(), mount_point, Arc::new(command))
    }

    #[test]
    fn test_creates_missing_mount_point_and_mounts() {
        let temp = TempDir::new().unwrap();
        let mount_point = temp.path().join("flood-data");

        let mut command = MockMountCommand::new();
        command
            .expect_mount()
            .times(1)
            .returning(|bucket, _| {
                assert_eq!(bucket, "flood-data");
                Ok(())
            });
        command.expect_unmount().never();

        let path = manager(mount_point.clone(), command).ensure_mounted().unwrap();

        assert_eq!(path, mount_point);
        assert!(mount_point.is_dir());
    }

    #[test]
    fn test_empty_mount_point_is_remounted() {
        let temp = TempDir::new().unwrap();
        let mount_point = temp.path().join("flood-data");
        fs::create_dir(&mount_point).unwrap();

        let mut command = MockMountCommand::new();
        command.expect_mount().times(1).returning(|_, _| Ok(()));
        command.expect_unmount().never();

        manager(mount_point, command).ensure_mounted().unwrap();
    }

    #[test]
    fn test_populated_mount_point_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let mount_point = temp.path().join("flood-data");
        fs::create_dir(&mount_point).unwrap();
        fs::write(mount_point.join("readme.txt"), "hello").unwrap();

        let mut command = MockMountCommand::new();
        command.expect_mount().never();
        command.expect_unmount().never();

        manager(mount_point, command).ensure_mounted().unwrap();
    }

    #[test]
    fn test_mount_failure_is_retried_once() {
        let temp = TempDir::new().unwrap();
        let mount_point = temp.path().join("flood-data");

        let mut seq = Sequence::new();
        let mut command = MockMountCommand::new();
        command
            .expect_mount()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(io::Error::other("transport endpoint is not connected")));
        command
            .expect_unmount()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        command
            .expect_mount()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        manager(mount_point, command).ensure_mounted().unwrap();
    }

    #[test]
    fn test_second_mount_failure_is_surfaced() {
        let temp = TempDir::new().unwrap();
        let mount_point = temp.path().join("flood-data");

        let mut command = MockMountCommand::new();
        command
            .expect_mount()
            .times(2)
            .returning(|_, _| Err(io::Error::other("goofys: bucket not found")));
        command.expect_unmount().times(1).returning(|_| Ok(()));

        let result = manager(mount_point, command).ensure_mounted();

        match result {
            Err(ExplorerError::MountFailed { reason, .. }) => {
                assert!(reason.contains("bucket not found"));
            }
            other => panic!("expected MountFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_mount_point_that_is_a_file_fails() {
        let temp = TempDir::new().unwrap();
        let mount_point = temp.path().join("flood-data");
        fs::write(&mount_point, "not a dir").unwrap();

        let mut command = MockMountCommand::new();
        command.expect_mount().never();

        let result = manager(mount_point, command).ensure_mounted();
        assert!(matches!(result, Err(ExplorerError::MountFailed { .. })));
    }

    #[test]
    fn test_remount_ignores_unmount_failure() {
        let temp = TempDir::new().unwrap();

        let mut command = MockMountCommand::new();
        command
            .expect_unmount()
            .times(1)
            .returning(|_| Err(io::Error::other("not mounted")));
        command.expect_mount().times(1).returning(|_, _| Ok(()));

        manager(temp.path().to_path_buf(), command).remount().unwrap();
    }

    #[test]
    fn test_is_transient() {
        assert!(is_transient(&io::Error::from_raw_os_error(ENOTCONN)));
        assert!(is_transient(&io::Error::from_raw_os_error(ESTALE)));
        assert!(is_transient(&io::Error::from_raw_os_error(EIO)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::NotFound)));
        assert!(!is_transient(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
    }

    #[test]
    fn test_external_command_reports_failure() {
        let temp = TempDir::new().unwrap();
        let command = ExternalMountCommand::new(
            CommandLine::parse("false").unwrap(),
            CommandLine::parse("true").unwrap(),
        );

        assert!(command.mount("flood-data", temp.path()).is_err());
        assert!(command.unmount(temp.path()).is_ok());
    }
}
