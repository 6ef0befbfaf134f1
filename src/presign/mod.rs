//! Presigned Upload URLs
//!
//! Issues short-lived URLs that let a client `PUT` one CSV straight into the
//! upload bucket, so file bytes never pass through this service.

use std::collections::HashMap;
use std::sync::Arc;

use url::form_urlencoded;

use crate::config::StorageConfig;
use crate::models::PresignResponse;
use crate::storage::ObjectStore;
use crate::types::AppResult;

/// Query parameters checked for the filename, in order.
pub const FILENAME_PARAMS: [&str; 3] = ["filename", "file", "name"];
pub const DEFAULT_FILENAME: &str = "users.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

pub struct PresignService {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    expires_in_secs: u32,
}

impl PresignService {
    pub fn new(config: &StorageConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            prefix: config.upload_prefix.clone(),
            expires_in_secs: config.presign_expiry_secs,
        }
    }

    /// First non-empty filename parameter, or the default.
    pub fn filename_from_params(params: &HashMap<String, String>) -> &str {
        FILENAME_PARAMS
            .iter()
            .filter_map(|name| params.get(*name))
            .map(String::as_str)
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
    }

    /// `<prefix>/<form-encoded filename>`, e.g. `a b.csv` becomes
    /// `uploads/a+b.csv`.
    pub fn object_key(&self, filename: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(filename.as_bytes()).collect();
        if self.prefix.is_empty() {
            encoded
        } else {
            format!("{}/{}", self.prefix, encoded)
        }
    }

    pub async fn presign(&self, params: &HashMap<String, String>) -> AppResult<PresignResponse> {
        let s3_key = self.object_key(Self::filename_from_params(params));
        let upload_url = self
            .store
            .presign_put(&s3_key, CSV_CONTENT_TYPE, self.expires_in_secs)
            .await?;

        Ok(PresignResponse { upload_url, s3_key })
    }
}
