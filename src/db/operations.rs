use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::models::UserRecord;
use crate::types::AppResult;

const UPSERT_PREFIX: &str =
    "INSERT INTO users (user_id, email, monthly_income, credit_score, employment_status, age) ";

const UPSERT_CONFLICT: &str = " ON CONFLICT (user_id) DO UPDATE SET \
    email = EXCLUDED.email, \
    monthly_income = EXCLUDED.monthly_income, \
    credit_score = EXCLUDED.credit_score, \
    employment_status = EXCLUDED.employment_status, \
    age = EXCLUDED.age";

/// Write side of the users table.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts or overwrites every writable record of `batch` in a single
    /// transaction and returns the number of rows written. Records without a
    /// user id or email are skipped; a batch with nothing writable never
    /// touches the database.
    async fn upsert_users(&self, batch: &[UserRecord]) -> AppResult<u64>;
}

/// Records of `batch` that can be written, in first-seen order. A user id
/// repeated within the batch keeps its last record, since Postgres refuses to
/// update the same row twice in one `ON CONFLICT` statement.
pub fn upsertable_rows(batch: &[UserRecord]) -> Vec<&UserRecord> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<&UserRecord> = Vec::new();

    for record in batch.iter().filter(|r| r.is_upsertable()) {
        let user_id = record.user_id.as_deref().unwrap_or_default();
        match positions.get(user_id) {
            Some(&pos) => rows[pos] = record,
            None => {
                positions.insert(user_id, rows.len());
                rows.push(record);
            }
        }
    }

    rows
}

/// Builds the multi-row upsert for `rows`. Every non-key column is
/// overwritten on conflict.
pub fn build_upsert<'args>(rows: &[&UserRecord]) -> QueryBuilder<'args, Postgres> {
    let mut builder = QueryBuilder::new(UPSERT_PREFIX);
    builder.push_values(rows, |mut row, record| {
        row.push_bind(record.user_id.clone())
            .push_bind(record.email.clone())
            .push_bind(record.monthly_income)
            .push_bind(record.credit_score)
            .push_bind(record.employment_status.clone())
            .push_bind(record.age);
    });
    builder.push(UPSERT_CONFLICT);
    builder
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn upsert_users(&self, batch: &[UserRecord]) -> AppResult<u64> {
        let rows = upsertable_rows(batch);
        if rows.len() < batch.len() {
            debug!(skipped = batch.len() - rows.len(), "Skipping incomplete or superseded rows");
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let result = build_upsert(&rows).build().execute(&mut *tx).await?;
        tx.commit().await?;

        info!("Inserted {} rows", rows.len());
        Ok(result.rows_affected())
    }
}
