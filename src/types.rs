// Error types shared by the ingest and presign paths

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<s3::error::S3Error> for AppError {
    fn from(err: s3::error::S3Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
