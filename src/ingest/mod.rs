//! CSV Ingestion
//!
//! Handles storage-created notifications. For every referenced object, in
//! notification order:
//!
//! 1. fetch the object bytes and decode them as UTF-8 (invalid sequences are
//!    replaced, never rejected)
//! 2. read the CSV header and map each row onto a [`UserRecord`]
//! 3. upsert the records in fixed-size batches, one transaction per batch
//! 4. notify the workflow webhook with the object key
//!
//! The first object that fails aborts the whole notification; objects after
//! it are not attempted.

pub mod parse;

use std::sync::Arc;

use tracing::{error, info};

use crate::config::IngestConfig;
use crate::db::UserRepository;
use crate::models::{IngestSummary, ObjectRef, StorageEvent, UserRecord};
use crate::storage::ObjectStore;
use crate::types::AppResult;
use crate::webhook::UploadNotifier;

pub use parse::{parse_integer, parse_numeric, ColumnMap};

pub struct CsvIngestService {
    store: Arc<dyn ObjectStore>,
    repository: Arc<dyn UserRepository>,
    notifier: Arc<dyn UploadNotifier>,
    batch_size: usize,
}

/// Result of ingesting one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectReport {
    pub rows_parsed: usize,
    pub batches: usize,
    pub rows_written: u64,
}

impl CsvIngestService {
    pub fn new(
        config: &IngestConfig,
        store: Arc<dyn ObjectStore>,
        repository: Arc<dyn UserRepository>,
        notifier: Arc<dyn UploadNotifier>,
    ) -> Self {
        Self {
            store,
            repository,
            notifier,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Processes every object in `event`. Errors are logged and returned;
    /// there is no partial-success report.
    pub async fn handle_event(&self, event: &StorageEvent) -> AppResult<IngestSummary> {
        match self.process_records(event).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(error = %e, "Error processing CSV");
                Err(e)
            }
        }
    }

    async fn process_records(&self, event: &StorageEvent) -> AppResult<IngestSummary> {
        for record in &event.records {
            let object = record.object_ref()?;
            info!(bucket = %object.bucket, key = %object.key, "Processing S3 object");

            self.ingest_object(&object).await?;
            self.notifier.notify_upload(&object.key).await;
        }

        Ok(IngestSummary {
            processed: event.records.len(),
        })
    }

    /// Fetches, parses and upserts one object. The webhook is not called here.
    pub async fn ingest_object(&self, object: &ObjectRef) -> AppResult<ObjectReport> {
        let body = self.store.get_object(&object.bucket, &object.key).await?;
        let text = String::from_utf8_lossy(&body);

        let mut reader = parse::reader(&text);
        let columns = ColumnMap::from_headers(reader.headers()?);

        let mut report = ObjectReport::default();
        let mut batch: Vec<UserRecord> = Vec::with_capacity(self.batch_size);

        for row in reader.records() {
            batch.push(columns.user_record(&row?));
            report.rows_parsed += 1;

            if batch.len() >= self.batch_size {
                self.flush(&mut batch, &mut report).await?;
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch, &mut report).await?;
        }

        info!(
            key = %object.key,
            rows = report.rows_parsed,
            batches = report.batches,
            written = report.rows_written,
            "Finished CSV object"
        );
        Ok(report)
    }

    async fn flush(&self, batch: &mut Vec<UserRecord>, report: &mut ObjectReport) -> AppResult<()> {
        report.rows_written += self.repository.upsert_users(batch).await?;
        report.batches += 1;
        batch.clear();
        Ok(())
    }
}
