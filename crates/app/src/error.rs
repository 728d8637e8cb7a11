#![forbid(unsafe_code)]

use lt_core::{MutationError, ValidationError};
use lt_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no record named {0:?}")]
    NotFound(String),
    /// A write failed and the in-memory change was rolled back.
    #[error("changes not saved: {0}")]
    Persistence(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MutationError> for SessionError {
    fn from(value: MutationError) -> Self {
        match value {
            MutationError::Validation(err) => Self::Validation(err),
            MutationError::NotFound(name) => Self::NotFound(name),
        }
    }
}
