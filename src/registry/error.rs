use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid registry identifier: {0} (expected namespace:version)")]
    InvalidIdentifier(String),

    #[error("Registry metadata for {namespace} not found: {reason}")]
    MetadataNotFound { namespace: String, reason: String },

    #[error("Upstream manifest for {namespace} unavailable: {reason}")]
    UpstreamMetadata { namespace: String, reason: String },

    #[error("Version {version} not found in registry {namespace}")]
    VersionNotFound { namespace: String, version: String },

    #[error("Malformed {file}: {reason}")]
    MalformedMetadata { file: String, reason: String },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }
}
