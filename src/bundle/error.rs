use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },
}

impl FetchError {
    /// HTTP status of the failed request, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Network(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Version not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("No download URL found for version {0}")]
    NoDownloadUrl(String),

    #[error("Can not download {identifier}: {source}")]
    Download {
        identifier: String,
        #[source]
        source: FetchError,
    },

    #[error("Can not extract {identifier}: {reason}")]
    Extract { identifier: String, reason: String },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Can not reach release API: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid release response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Rar error: {0}")]
    Rar(String),

    #[error("Unsupported archive format: {0}")]
    Unsupported(&'static str),

    #[error("Archive is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
