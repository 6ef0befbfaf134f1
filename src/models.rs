use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use crate::config::Config;
use crate::db::PgUserRepository;
use crate::ingest::CsvIngestService;
use crate::presign::PresignService;
use crate::storage::S3Storage;
use crate::types::{AppError, AppResult};
use crate::webhook::WebhookNotifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ingest: Arc<CsvIngestService>,
    pub presign: Arc<PresignService>,
    /// Users database, when the state is backed by Postgres.
    pub db: Option<PgPool>,
}

impl AppState {
    /// Wires the production collaborators: S3 storage, the Postgres users
    /// repository and the workflow webhook.
    pub fn from_config(config: Config, pool: PgPool) -> AppResult<Self> {
        let storage = Arc::new(S3Storage::from_config(&config.storage)?);
        let repository = Arc::new(PgUserRepository::new(pool.clone()));
        let notifier = Arc::new(WebhookNotifier::from_config(&config.webhook)?);
        if !notifier.is_configured() {
            warn!("N8N webhook not configured; uploads will not trigger the workflow");
        }

        let ingest = CsvIngestService::new(&config.ingest, storage.clone(), repository, notifier);
        let presign = PresignService::new(&config.storage, storage);

        Ok(Self {
            db: Some(pool),
            ..Self::with_services(config, ingest, presign)
        })
    }

    pub fn with_services(config: Config, ingest: CsvIngestService, presign: PresignService) -> Self {
        Self {
            config,
            ingest: Arc::new(ingest),
            presign: Arc::new(presign),
            db: None,
        }
    }
}

/// One row of an uploaded CSV after coercion.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserRecord {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub monthly_income: Option<f64>,
    pub credit_score: Option<i64>,
    pub employment_status: Option<String>,
    pub age: Option<i64>,
}

impl UserRecord {
    /// Both the upsert key and the email must be present and non-empty for a
    /// record to be written.
    pub fn is_upsertable(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.user_id) && present(&self.email)
    }
}

// Storage-created notification, in the S3 event JSON layout:
// {"Records":[{"s3":{"bucket":{"name":..},"object":{"key":..}}}]}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StorageEventRecord {
    #[serde(default)]
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: S3Bucket,
    #[serde(default)]
    pub object: S3Object,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct S3Bucket {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct S3Object {
    pub key: Option<String>,
}

/// A resolved (bucket, key) pair taken from a notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl StorageEvent {
    pub fn from_refs<'a>(refs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let records = refs
            .into_iter()
            .map(|(bucket, key)| StorageEventRecord {
                s3: S3Entity {
                    bucket: S3Bucket { name: Some(bucket.to_string()) },
                    object: S3Object { key: Some(key.to_string()) },
                },
            })
            .collect();
        Self { records }
    }
}

impl StorageEventRecord {
    pub fn object_ref(&self) -> AppResult<ObjectRef> {
        let bucket = self
            .s3
            .bucket
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::InvalidEvent("record is missing s3.bucket.name".to_string()))?;
        let key = self
            .s3
            .object
            .key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::InvalidEvent("record is missing s3.object.key".to_string()))?;
        Ok(ObjectRef { bucket, key })
    }
}

// API Request/Response types

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PresignResponse {
    pub upload_url: String,
    pub s3_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IngestSummary {
    /// Number of notification entries handled.
    pub processed: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
