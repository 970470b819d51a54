//! `sem-storage`'s own error taxonomy, layered on top of `sem_core::CoreError`
//! at the CLI boundary via `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("binary codec failure: {0}")]
    Codec(#[from] bincode::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
