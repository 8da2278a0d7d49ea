// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("process not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ghost_core::GhostError {
    fn from(err: StorageError) -> Self {
        ghost_core::GhostError::StorageFailed(err.to_string())
    }
}
