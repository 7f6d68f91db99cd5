//! Uploads: stage locally, write to the object store, clean up.

use crate::listing::pretty_size;
use crate::object_store::ObjectStore;
use crate::paths::MountPaths;
use crate::validation::secure_filename;
use crate::{ExplorerError, ExplorerResult};
use bucketview_files::StagingArea;
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

/// Result of a successful upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Sanitized filename the object was stored under.
    pub filename: String,
    pub key: String,
    pub size: u64,
}

/// Streams uploads through the staging area into the object store.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    staging: StagingArea,
    bucket: String,
    paths: MountPaths,
}

impl Uploader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        staging: StagingArea,
        bucket: String,
        paths: MountPaths,
    ) -> Self {
        Self {
            store,
            staging,
            bucket,
            paths,
        }
    }

    /// Uploads one file into `dest_dir`.
    ///
    /// The client filename is passed through [`secure_filename`]; if nothing is
    /// left of it the upload is skipped and `Ok(None)` is returned. The staged
    /// copy is deleted whether or not the remote write succeeds.
    ///
    /// # Arguments
    ///
    /// * `body` - The file contents as a stream of chunks.
    /// * `client_filename` - Filename as sent by the browser.
    /// * `dest_dir` - Local directory inside the mount the file belongs to.
    ///
    /// # Errors
    ///
    /// - `ExplorerError::PathOutsideMount` if `dest_dir` is not inside the mount.
    /// - `ExplorerError::UploadBody` if reading the request body fails.
    /// - `ExplorerError::RemoteWriteFailure` if the object store rejects the write.
    pub async fn upload<S, B, E>(
        &self,
        body: S,
        client_filename: &str,
        dest_dir: &Path,
    ) -> ExplorerResult<Option<UploadOutcome>>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let Some(filename) = secure_filename(client_filename) else {
            return Ok(None);
        };
        let key = self.paths.object_key(dest_dir, &filename)?;

        let mut staged = self.staging.create(&filename).await?;
        let mut body = std::pin::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ExplorerError::UploadBody(e.to_string()))?;
            staged.write_chunk(chunk.as_ref()).await?;
        }
        staged.finish().await?;

        let size = staged.size();
        let result = self
            .store
            .put_object(staged.path(), &self.bucket, &key)
            .await;

        if let Err(e) = staged.remove() {
            tracing::error!("staging cleanup error: {:?}", e);
        }

        match result {
            Ok(()) => {
                tracing::info!("uploaded {} ({}) to {}", key, pretty_size(size), self.bucket);
                Ok(Some(UploadOutcome {
                    filename,
                    key,
                    size,
                }))
            }
            Err(source) => {
                tracing::error!(
                    "failed to upload {} ({}) to {}: {}",
                    dest_dir.join(&filename).display(),
                    pretty_size(size),
                    self.bucket,
                    source
                );
                Err(ExplorerError::RemoteWriteFailure { key, size, source })
            }
        }
    }
}
