//! S3-compatible implementation of [`ObjectStore`]

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::{
    error::SdkError, operation::head_object::HeadObjectError, presigning::PresigningConfig,
    primitives::ByteStream, Client as S3Client,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{NewObject, ObjectStore, PresignedUrl, StoreError, StoreResult, ORIGINAL_NAME_METADATA_KEY};

/// Object store backed by an S3-compatible bucket
pub struct S3ObjectStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3ObjectStore {
    /// Creates a new store over a pre-configured S3 client
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket holding uploaded images
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }

    /// Name of the bucket this store writes to
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }
}

/// S3 user metadata must be printable ASCII, so only other bytes are percent-encoded.
fn encode_metadata_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_graphic() || byte == b' ' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, object: NewObject) -> StoreResult<()> {
        debug!(
            "Writing object {} ({} bytes, {})",
            key,
            object.body.len(),
            object.content_type
        );

        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(object.body))
            .content_type(object.content_type)
            .metadata(
                ORIGINAL_NAME_METADATA_KEY,
                encode_metadata_value(&object.original_name),
            )
            .send()
            .await?;

        Ok(())
    }

    /// Checks if an object exists in the bucket
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if object exists
    /// * `Ok(false)` if object does not exist
    /// * `Err(StoreError)` if the head request fails for any other reason
    async fn object_exists(&self, key: &str) -> StoreResult<bool> {
        let result = self
            .s3_client
            .head_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
            {
                Ok(false)
            }
            Err(SdkError::ServiceError(service_err))
                if service_err.raw().status().as_u16() >= 500 =>
            {
                Err(StoreError::UpstreamError(format!("{service_err:?}")))
            }
            Err(e) => Err(StoreError::from(e)),
        }
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<PresignedUrl> {
        let presigned_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            StoreError::ConfigError(format!("Failed to create presigning config: {e}"))
        })?;

        // Stamp the expiry before signing so it never overstates the window
        let expires_at: DateTime<Utc> = Utc::now() + expires_in;

        let presigned_request = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigned_config)
            .await
            .map_err(|e| StoreError::S3Error(format!("Failed to generate presigned URL: {e}")))?;

        Ok(PresignedUrl {
            url: presigned_request.uri().to_string(),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_value_keeps_plain_ascii() {
        assert_eq!(encode_metadata_value("a.txt"), "a.txt");
        assert_eq!(encode_metadata_value("my photo.png"), "my photo.png");
        assert_eq!(encode_metadata_value(""), "");
    }

    #[test]
    fn metadata_value_keeps_percent_in_ascii_names() {
        assert_eq!(encode_metadata_value("100%.png"), "100%.png");
        assert_eq!(encode_metadata_value("a%20b.txt"), "a%20b.txt");
    }

    #[test]
    fn metadata_value_escapes_non_ascii_and_control_bytes() {
        assert_eq!(encode_metadata_value("café.jpg"), "caf%C3%A9.jpg");
        assert_eq!(encode_metadata_value("a\nb"), "a%0Ab");
    }

    #[tokio::test]
    async fn presigned_get_url_targets_bucket_and_key() {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("auto"))
            .endpoint_url("http://localhost:4566")
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                "test", "test", None, None, "test",
            ))
            .force_path_style(true)
            .build();
        let store = S3ObjectStore::new(Arc::new(S3Client::from_conf(config)), "images".into());

        let presigned = store
            .presigned_get_url("abc123", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(presigned
            .url
            .starts_with("http://localhost:4566/images/abc123?"));
        assert!(presigned.url.contains("X-Amz-Expires=3600"));
        assert_eq!(store.bucket_name(), "images");
    }
}
