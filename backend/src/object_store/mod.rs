//! Object storage seam used by the upload and retrieval handlers

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod s3;

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use error::{StoreError, StoreResult};
pub use s3::S3ObjectStore;

/// User metadata key recording the uploader-supplied filename
pub const ORIGINAL_NAME_METADATA_KEY: &str = "originalname";

/// Payload and attributes of an object about to be written
#[derive(Debug, Clone)]
pub struct NewObject {
    /// Raw object bytes
    pub body: Bytes,
    /// Content type declared by the uploader, not verified
    pub content_type: String,
    /// Original filename, possibly empty
    pub original_name: String,
}

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL for GET operations
    pub url: String,
    /// UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
}

/// Capabilities the gateway needs from an S3-compatible backend
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `object` under `key`, replacing nothing (keys are fresh)
    async fn put_object(&self, key: &str, object: NewObject) -> StoreResult<()>;

    /// Returns `Ok(false)` when no object lives under `key`
    async fn object_exists(&self, key: &str) -> StoreResult<bool>;

    /// Mints a bearer URL granting read access to `key` for `expires_in`
    async fn presigned_get_url(&self, key: &str, expires_in: Duration)
        -> StoreResult<PresignedUrl>;
}
