// Upload Ingest - presigned CSV uploads and batched Postgres upsert of user records

pub mod config;
pub mod db;
pub mod models;
pub mod types;
pub mod ingest;
pub mod presign;
pub mod storage;
pub mod webhook;
pub mod routes;
pub mod middleware;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
