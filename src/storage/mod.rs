// Storage layer (S3-compatible)

use async_trait::async_trait;

use crate::types::AppResult;

pub mod s3_client;

pub use s3_client::*;

/// Object storage operations used by the ingest and presign paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the full content of `key` in `bucket`.
    async fn get_object(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>>;

    /// Issues a URL allowing a single `PUT` of `key` into the upload bucket
    /// with the given content type, valid for `expires_in_secs`.
    async fn presign_put(&self, key: &str, content_type: &str, expires_in_secs: u32) -> AppResult<String>;
}
