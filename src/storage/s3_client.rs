use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use s3::creds::Credentials;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

use super::ObjectStore;
use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};

pub struct S3Storage {
    upload_bucket: String,
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Storage {
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        // A custom endpoint means an S3-compatible store (MinIO, R2, ...),
        // which generally only supports path-style addressing.
        let (region, path_style) = match &config.s3_endpoint {
            Some(endpoint) => (
                Region::Custom {
                    region: config.s3_region.clone(),
                    endpoint: endpoint.clone(),
                },
                true,
            ),
            None => (
                config
                    .s3_region
                    .parse::<Region>()
                    .map_err(|e| AppError::Config(format!("invalid S3 region {:?}: {}", config.s3_region, e)))?,
                false,
            ),
        };

        let credentials = match (&config.s3_access_key_id, &config.s3_secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                Credentials::new(Some(access_key.as_str()), Some(secret_key.as_str()), None, None, None)
            }
            _ => Credentials::default(),
        }
        .map_err(|e| AppError::Config(format!("failed to load S3 credentials: {}", e)))?;

        Ok(Self {
            upload_bucket: config.s3_bucket.clone(),
            region,
            credentials,
            path_style,
        })
    }

    fn bucket(&self, name: &str) -> AppResult<Bucket> {
        let mut bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())?;
        if self.path_style {
            bucket = bucket.with_path_style();
        }
        Ok(bucket)
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn get_object(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>> {
        let response = self.bucket(bucket)?.get_object(key).await?;
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::Storage(format!(
                "GET s3://{}/{} returned status {}",
                bucket, key, status
            )));
        }

        let data = response.bytes().to_vec();
        debug!(bucket, key, bytes = data.len(), "Fetched object");
        Ok(data)
    }

    async fn presign_put(&self, key: &str, content_type: &str, expires_in_secs: u32) -> AppResult<String> {
        if self.upload_bucket.is_empty() {
            return Err(AppError::Config("S3_BUCKET is not configured".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .map_err(|e| AppError::Internal(format!("invalid content type {:?}: {}", content_type, e)))?,
        );

        let url = self
            .bucket(&self.upload_bucket)?
            .presign_put(key, expires_in_secs, Some(headers))
            .await?;
        Ok(url)
    }
}
