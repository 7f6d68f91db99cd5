//! Object-store client used for uploads.
//!
//! Writes go straight to the object store rather than through the FUSE mount,
//! which is read-mostly and slow for large files.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ObjectStoreError(pub String);

/// Uploads local files to a bucket.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes the file at `local_path` to `bucket` under `key`, replacing any
    /// existing object.
    async fn put_object(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<(), ObjectStoreError>;
}

/// [`ObjectStore`] backed by the AWS S3 SDK.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the standard AWS environment (credentials chain,
    /// region and optional endpoint override).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<(), ObjectStoreError> {
        // Streamed from disk; the file is never loaded into memory.
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            ObjectStoreError(format!(
                "cannot read {}: {}",
                local_path.display(),
                DisplayErrorContext(&e)
            ))
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| ObjectStoreError(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!("stored s3://{}/{}", bucket, key);
        Ok(())
    }
}
