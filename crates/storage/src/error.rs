#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("quota exceeded (key={key}, bytes={bytes}, quota={quota})")]
    QuotaExceeded {
        key: String,
        bytes: usize,
        quota: usize,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt value (key={key}): {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
