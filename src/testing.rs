// In-memory stand-ins for storage, the users table and the webhook

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::{upsertable_rows, UserRepository};
use crate::models::UserRecord;
use crate::storage::ObjectStore;
use crate::types::{AppError, AppResult};
use crate::webhook::{UploadNotifier, WebhookOutcome};

/// CSV text with the full header and `rows` complete records `u0..u{rows-1}`.
pub fn csv_with_rows(rows: usize) -> Vec<u8> {
    let mut text = String::from("user_id,email,monthly_income,credit_score,employment_status,age\n");
    for i in 0..rows {
        text.push_str(&format!("u{i},user{i}@example.com,{}.5,{},employed,{}\n", 1000 + i, 600 + i % 250, 20 + i % 50));
    }
    text.into_bytes()
}

pub struct MemoryStore {
    upload_bucket: String,
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    presigned: Mutex<Vec<(String, String, u32)>>,
    fail_presign: bool,
}

impl MemoryStore {
    pub fn new(upload_bucket: &str) -> Self {
        Self {
            upload_bucket: upload_bucket.to_string(),
            objects: Mutex::new(HashMap::new()),
            presigned: Mutex::new(Vec::new()),
            fail_presign: false,
        }
    }

    pub fn failing_presign(upload_bucket: &str) -> Self {
        Self {
            fail_presign: true,
            ..Self::new(upload_bucket)
        }
    }

    pub fn put(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
    }

    /// Every presign request as (key, content type, expiry seconds).
    pub fn presigned(&self) -> Vec<(String, String, u32)> {
        self.presigned.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("NoSuchKey: s3://{}/{}", bucket, key)))
    }

    async fn presign_put(&self, key: &str, content_type: &str, expires_in_secs: u32) -> AppResult<String> {
        if self.fail_presign {
            return Err(AppError::Storage("AccessDenied".to_string()));
        }
        self.presigned
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), expires_in_secs));
        Ok(format!(
            "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}",
            self.upload_bucket, key, expires_in_secs
        ))
    }
}

/// Applies upserts to a map with last-write-wins semantics and records the
/// size of every batch it receives.
#[derive(Default)]
pub struct MemoryUserRepository {
    rows: Mutex<BTreeMap<String, UserRecord>>,
    batch_sizes: Mutex<Vec<usize>>,
    fail_on_call: Option<usize>,
}

impl MemoryUserRepository {
    /// Fails the `call`-th upsert (1-based) without applying it.
    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.rows.lock().unwrap().get(user_id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, UserRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn upsert_users(&self, batch: &[UserRecord]) -> AppResult<u64> {
        let call = {
            let mut sizes = self.batch_sizes.lock().unwrap();
            sizes.push(batch.len());
            sizes.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(AppError::Internal("connection reset".to_string()));
        }

        let rows = upsertable_rows(batch);
        let mut table = self.rows.lock().unwrap();
        for record in &rows {
            let user_id = record.user_id.clone().unwrap_or_default();
            table.insert(user_id, (*record).clone());
        }
        Ok(rows.len() as u64)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    keys: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadNotifier for RecordingNotifier {
    async fn notify_upload(&self, s3_key: &str) -> WebhookOutcome {
        self.keys.lock().unwrap().push(s3_key.to_string());
        WebhookOutcome::Delivered(200)
    }
}
