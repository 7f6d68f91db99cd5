/// Folder under the temp dir holding upload staging files.
pub const STAGING_FOLDER_NAME: &str = "staging";

/// Folder under the temp dir holding directory archives.
pub const ARCHIVES_FOLDER_NAME: &str = "archives";
