//! S3-compatible object storage
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, types::ObjectCannedAcl, Client as S3Client};
use axum::body::Bytes;

pub use error::{BucketError, BucketResult};

/// Metadata attached to an object on write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Whether the object is readable by anyone
    pub public_read: bool,
    /// Content type served with the object
    pub content_type: Option<String>,
}

impl ObjectMetadata {
    /// Metadata for a publicly readable object
    #[must_use]
    pub const fn public(content_type: Option<String>) -> Self {
        Self {
            public_read: true,
            content_type,
        }
    }
}

/// Single-shot object writes into one bucket
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Writes `body` under `key`, replacing any existing object
    async fn put_object(&self, key: &str, body: Bytes, metadata: &ObjectMetadata)
        -> BucketResult<()>;
}

/// Object storage client for S3 operations
pub struct S3ObjectStorage {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3ObjectStorage {
    /// Creates a new object storage client
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket all objects are written into
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    /// # Errors
    ///
    /// Returns `BucketError::UpstreamError` for 5xx errors
    /// Returns `BucketError::S3Error` for other S3 service errors
    /// Returns `BucketError::AwsError` when the request never got a response
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        metadata: &ObjectMetadata,
    ) -> BucketResult<()> {
        let acl = metadata.public_read.then_some(ObjectCannedAcl::PublicRead);

        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(body))
            .set_acl(acl)
            .set_content_type(metadata.content_type.clone())
            .send()
            .await?;

        Ok(())
    }
}
