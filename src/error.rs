//! Crate-wide error type

use thiserror::Error;

use crate::bundle::error::{CacheError, CatalogError, UpdateError};
use crate::link::error::LinkError;
use crate::registry::error::RegistryError;

/// Coarse failure category reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Download,
    Extract,
    Metadata,
    Link,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Update(#[from] UpdateError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Catalog(CatalogError::NotFound(_)) => ErrorKind::NotFound,
            Error::Cache(CacheError::NoDownloadUrl(_)) => ErrorKind::NotFound,
            Error::Cache(CacheError::Download { .. }) => ErrorKind::Download,
            Error::Cache(CacheError::Extract { .. } | CacheError::Io { .. }) => ErrorKind::Extract,
            Error::Link(_) => ErrorKind::Link,
            Error::Registry(RegistryError::VersionNotFound { .. }) => ErrorKind::NotFound,
            Error::Registry(_) => ErrorKind::Metadata,
            Error::Update(_) => ErrorKind::Metadata,
        }
    }
}
