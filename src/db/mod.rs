use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::types::AppResult;

pub use operations::*;

pub mod operations;

/// Creates the users database pool without connecting. Misconfiguration
/// surfaces on the first upsert rather than at startup.
pub fn create_pool(config: &DatabaseConfig) -> PgPool {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_lazy_with(config.connect_options())
}

/// Round-trips `SELECT 1` through the pool.
pub async fn health_check(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
