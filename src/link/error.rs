use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Invalid timestamp in link table: {0}")]
    InvalidTimestamp(String),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Blend file not found: {0:?}")]
    MissingSource(PathBuf),

    #[error("Blend file path leaves the release directory: {0}")]
    UnsafeSource(String),

    #[error("Link table error: {0}")]
    Store(#[from] StoreError),
}
