//! Common types for bundle resolution and caching

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Archive format of a release asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Zip,
    Rar,
}

impl ArchiveKind {
    /// Infer the archive kind from a download URL; anything that is not
    /// `.rar` is treated as zip.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.to_ascii_lowercase().ends_with(".rar") {
            ArchiveKind::Rar
        } else {
            ArchiveKind::Zip
        }
    }

    /// Whether this build can extract the format
    pub fn is_supported(&self) -> bool {
        match self {
            ArchiveKind::Zip => true,
            ArchiveKind::Rar => cfg!(feature = "rar"),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => ".zip",
            ArchiveKind::Rar => ".rar",
        }
    }
}

/// Bearer token attached to downloads of private releases
#[derive(Clone, PartialEq, Eq)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

/// A resolved, downloadable unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    /// Version ("1.2.1") or registry identifier ("namespace:version")
    pub identifier: String,
    pub download_url: String,
    pub archive_kind: ArchiveKind,
    pub credential: Option<SecretToken>,
}

impl VersionDescriptor {
    pub fn new(identifier: impl Into<String>, download_url: impl Into<String>) -> Self {
        let download_url = download_url.into();
        Self {
            identifier: identifier.into(),
            archive_kind: ArchiveKind::from_url(&download_url),
            download_url,
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Option<SecretToken>) -> Self {
        self.credential = credential;
        self
    }
}

/// Extracted content for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub identifier: String,
    pub local_path: PathBuf,
    pub extracted_at: Option<DateTime<Utc>>,
}
