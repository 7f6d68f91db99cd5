//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handlers never read environment variables; they get the
//! resolved values through the application state.

use crate::constants::DEFAULT_GITHUB_API_URL;
use crate::{ExplorerError, ExplorerResult};
use std::path::{Path, PathBuf};

/// An external program plus its leading arguments, e.g. `fusermount -u`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Splits a command string on whitespace; the first word is the program.
    pub fn parse(value: &str) -> ExplorerResult<Self> {
        let mut words = value.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| ExplorerError::InvalidConfig("command cannot be empty".into()))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Credentials and target repository for bug reports.
#[derive(Clone, Debug)]
pub struct IssueTrackerConfig {
    pub token: String,
    pub org: String,
    pub repo: String,
    pub api_url: String,
}

impl IssueTrackerConfig {
    /// Builds the tracker config when all three values are present and non-empty.
    ///
    /// Bug reporting is optional, so missing values yield `None` rather than an error.
    pub fn from_env_values(
        token: Option<String>,
        org: Option<String>,
        repo: Option<String>,
    ) -> Option<Self> {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Some(Self {
            token: non_empty(token)?,
            org: non_empty(org)?,
            repo: non_empty(repo)?,
            api_url: DEFAULT_GITHUB_API_URL.into(),
        })
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    bucket: String,
    mount_root: PathBuf,
    temp_dir: PathBuf,
    job_api_url: String,
    mount_command: CommandLine,
    unmount_command: CommandLine,
    issue_tracker: Option<IssueTrackerConfig>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ExplorerError::InvalidConfig` if:
    /// - the bucket name is empty or contains a path separator,
    /// - the mount root is not absolute,
    /// - the job API URL is empty.
    pub fn new(
        bucket: String,
        mount_root: PathBuf,
        temp_dir: PathBuf,
        job_api_url: String,
        mount_command: CommandLine,
        unmount_command: CommandLine,
    ) -> ExplorerResult<Self> {
        let bucket = bucket.trim().to_string();
        if bucket.is_empty() {
            return Err(ExplorerError::InvalidConfig(
                "AWS_S3_BUCKET cannot be empty".into(),
            ));
        }
        if bucket.contains('/') || bucket == "." || bucket == ".." {
            return Err(ExplorerError::InvalidConfig(format!(
                "AWS_S3_BUCKET is not a valid bucket name: {bucket}"
            )));
        }
        if !mount_root.is_absolute() {
            return Err(ExplorerError::InvalidConfig(format!(
                "MOUNT_ROOT must be an absolute path: {}",
                mount_root.display()
            )));
        }
        let job_api_url = job_api_url.trim().trim_end_matches('/').to_string();
        if job_api_url.is_empty() {
            return Err(ExplorerError::InvalidConfig(
                "JOB_API_URL cannot be empty".into(),
            ));
        }

        Ok(Self {
            bucket,
            mount_root,
            temp_dir,
            job_api_url,
            mount_command,
            unmount_command,
            issue_tracker: None,
        })
    }

    pub fn with_issue_tracker(mut self, tracker: Option<IssueTrackerConfig>) -> Self {
        self.issue_tracker = tracker;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// Local directory at which the bucket is mounted: `<mount root>/<bucket>`.
    pub fn mount_point(&self) -> PathBuf {
        self.mount_root.join(&self.bucket)
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn job_api_url(&self) -> &str {
        &self.job_api_url
    }

    pub fn mount_command(&self) -> &CommandLine {
        &self.mount_command
    }

    pub fn unmount_command(&self) -> &CommandLine {
        &self.unmount_command
    }

    pub fn issue_tracker(&self) -> Option<&IssueTrackerConfig> {
        self.issue_tracker.as_ref()
    }
}

/// Parse a command line from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, `default` is used.
pub fn command_from_env_value(value: Option<String>, default: &str) -> ExplorerResult<CommandLine> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    CommandLine::parse(value.as_deref().unwrap_or(default))
}

/// Parse a duration in seconds from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, `default` is returned.
pub fn seconds_from_env_value(value: Option<String>, default: u64) -> ExplorerResult<u64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map_err(|e| ExplorerError::InvalidConfig(format!("expected seconds, got {v:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_MOUNT_COMMAND, DEFAULT_UNMOUNT_COMMAND};

    fn config(bucket: &str, mount_root: &str) -> ExplorerResult<CoreConfig> {
        CoreConfig::new(
            bucket.into(),
            PathBuf::from(mount_root),
            PathBuf::from("/tmp/bucketview"),
            "http://api:5678/".into(),
            CommandLine::parse(DEFAULT_MOUNT_COMMAND).unwrap(),
            CommandLine::parse(DEFAULT_UNMOUNT_COMMAND).unwrap(),
        )
    }

    #[test]
    fn test_mount_point_joins_root_and_bucket() {
        let cfg = config("flood-data", "/").unwrap();
        assert_eq!(cfg.mount_point(), PathBuf::from("/flood-data"));
        assert_eq!(cfg.job_api_url(), "http://api:5678");
    }

    #[test]
    fn test_rejects_bad_bucket_and_root() {
        assert!(matches!(config("", "/"), Err(ExplorerError::InvalidConfig(_))));
        assert!(matches!(config("a/b", "/"), Err(ExplorerError::InvalidConfig(_))));
        assert!(matches!(config("..", "/"), Err(ExplorerError::InvalidConfig(_))));
        assert!(matches!(
            config("bucket", "relative/root"),
            Err(ExplorerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_command_line_parsing() {
        let cmd = command_from_env_value(None, "fusermount -u").unwrap();
        assert_eq!(cmd.program(), "fusermount");
        assert_eq!(cmd.args(), ["-u".to_string()]);

        let cmd = command_from_env_value(Some("  umount  ".into()), "fusermount -u").unwrap();
        assert_eq!(cmd.program(), "umount");
        assert!(cmd.args().is_empty());

        assert!(CommandLine::parse("   ").is_err());
    }

    #[test]
    fn test_seconds_from_env_value() {
        assert_eq!(seconds_from_env_value(None, 60).unwrap(), 60);
        assert_eq!(seconds_from_env_value(Some(" ".into()), 60).unwrap(), 60);
        assert_eq!(seconds_from_env_value(Some("3600".into()), 60).unwrap(), 3600);
        assert!(seconds_from_env_value(Some("soon".into()), 60).is_err());
    }

    #[test]
    fn test_issue_tracker_requires_all_values() {
        assert!(IssueTrackerConfig::from_env_values(
            Some("token".into()),
            Some("org".into()),
            None
        )
        .is_none());
        assert!(IssueTrackerConfig::from_env_values(
            Some("token".into()),
            Some(" ".into()),
            Some("repo".into())
        )
        .is_none());

        let tracker = IssueTrackerConfig::from_env_values(
            Some("token".into()),
            Some("org".into()),
            Some("repo".into()),
        )
        .unwrap();
        assert_eq!(tracker.api_url, DEFAULT_GITHUB_API_URL);
    }
}
