use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::bundle::archive;
use crate::bundle::error::CacheError;
use crate::bundle::fetcher::Fetcher;
use crate::bundle::types::{CacheEntry, VersionDescriptor};

/// Prefix for in-flight downloads and staging directories under the root.
/// Entries starting with it are never reported as cache entries.
const STAGING_PREFIX: &str = ".staging-";

/// Suffix of the hidden file recording the identifier of an entry whose
/// directory name differs from it
const IDENTIFIER_SUFFIX: &str = ".identifier";

/// Local directory of extracted release archives, one subdirectory per
/// identifier.
#[derive(Clone)]
pub struct ArchiveCache {
    root: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    /// Names under the root owned by someone else
    reserved: Vec<String>,
}

impl ArchiveCache {
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Result<Self, CacheError> {
        let root = root.into();
        info!("Initializing archive cache at {:?}", root);
        fs::create_dir_all(&root).map_err(|e| CacheError::io(&root, e))?;
        Ok(Self {
            root,
            fetcher,
            reserved: Vec::new(),
        })
    }

    /// Leave `name` under the root alone: it is never listed as an entry
    /// and survives `purge_all`.
    pub fn with_reserved(mut self, name: impl Into<String>) -> Self {
        self.reserved.push(name.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the content for `identifier`
    pub fn entry_path(&self, identifier: &str) -> PathBuf {
        self.root.join(dir_name(identifier))
    }

    /// The cache entry for `identifier`, if it has been materialized
    pub fn entry(&self, identifier: &str) -> Option<CacheEntry> {
        if self.is_reserved(OsStr::new(&dir_name(identifier))) {
            return None;
        }
        let path = self.entry_path(identifier);
        let metadata = fs::metadata(&path).ok().filter(|m| m.is_dir())?;
        Some(CacheEntry {
            identifier: identifier.to_string(),
            extracted_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            local_path: path,
        })
    }

    /// Every materialized entry, sorted by directory name
    pub fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.root, e)),
        };

        let mut entries: Vec<CacheEntry> = read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter(|entry| !self.is_reserved(&entry.file_name()))
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if name.starts_with('.') {
                    return None;
                }
                Some(CacheEntry {
                    extracted_at: entry
                        .metadata()
                        .and_then(|m| m.modified())
                        .ok()
                        .map(DateTime::<Utc>::from),
                    local_path: entry.path(),
                    identifier: self.identifier_of(&name),
                })
            })
            .collect();

        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(entries)
    }

    /// Make sure the content for `descriptor` exists locally and return its
    /// path. An existing entry is returned without touching the network.
    pub async fn ensure(&self, descriptor: &VersionDescriptor) -> Result<PathBuf, CacheError> {
        let dest = self.entry_path(&descriptor.identifier);
        if dest.is_dir() {
            info!(
                "Version {} found at {:?}, using the local copy",
                descriptor.identifier, dest
            );
            return Ok(dest);
        }

        self.materialize(descriptor).await
    }

    /// Delete any existing entry for `descriptor` and download it again.
    ///
    /// A failed deletion is logged and the download is attempted anyway.
    pub async fn repair(&self, descriptor: &VersionDescriptor) -> Result<PathBuf, CacheError> {
        let dest = self.entry_path(&descriptor.identifier);
        if dest.exists() {
            match fs::remove_dir_all(&dest) {
                Ok(()) => info!("Removed broken version folder {:?}", dest),
                Err(e) => warn!("Failed to remove broken folder {:?}: {}", dest, e),
            }
        }

        self.materialize(descriptor).await
    }

    /// Delete the whole cache root, or every unreserved name under it. A
    /// missing root is not an error.
    pub fn purge_all(&self) -> Result<(), CacheError> {
        if !self.reserved.is_empty() {
            return self.purge_unreserved();
        }

        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                info!("Removed all downloaded versions at {:?}", self.root);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache directory at {:?} to clean", self.root);
                Ok(())
            }
            Err(e) => Err(CacheError::io(&self.root, e)),
        }
    }

    fn purge_unreserved(&self) -> Result<(), CacheError> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(&self.root, e)),
        };

        for entry in read_dir {
            let entry = entry.map_err(|e| CacheError::io(&self.root, e))?;
            if self.is_reserved(&entry.file_name()) {
                continue;
            }
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| CacheError::io(&path, e))?;
        }

        info!(
            "Removed all downloaded versions at {:?}, kept {:?}",
            self.root, self.reserved
        );
        Ok(())
    }

    fn is_reserved(&self, name: &OsStr) -> bool {
        name.to_str()
            .is_some_and(|name| self.reserved.iter().any(|r| r == name))
    }

    fn identifier_file(&self, dir: &str) -> PathBuf {
        self.root.join(format!(".{dir}{IDENTIFIER_SUFFIX}"))
    }

    /// Identifier of the entry stored in directory `dir`
    fn identifier_of(&self, dir: &str) -> String {
        fs::read_to_string(self.identifier_file(dir))
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|_| dir.to_string())
    }

    /// Download, extract and move the content into place.
    ///
    /// Work happens in temporary files under the root so a failure never
    /// leaves a partial entry behind.
    async fn materialize(&self, descriptor: &VersionDescriptor) -> Result<PathBuf, CacheError> {
        let identifier = descriptor.identifier.as_str();
        if descriptor.download_url.is_empty() {
            return Err(CacheError::NoDownloadUrl(identifier.to_string()));
        }
        if !descriptor.archive_kind.is_supported() {
            return Err(CacheError::Extract {
                identifier: identifier.to_string(),
                reason: format!(
                    "{} archives need the `rar` feature",
                    descriptor.archive_kind.extension()
                ),
            });
        }

        fs::create_dir_all(&self.root).map_err(|e| CacheError::io(&self.root, e))?;

        info!(
            "Found version {} at {}",
            identifier, descriptor.download_url
        );
        let bytes = self
            .fetcher
            .fetch(&descriptor.download_url, descriptor.credential.as_ref())
            .await
            .map_err(|source| CacheError::Download {
                identifier: identifier.to_string(),
                source,
            })?;

        let mut archive_file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(descriptor.archive_kind.extension())
            .tempfile_in(&self.root)
            .map_err(|e| CacheError::io(&self.root, e))?;
        archive_file
            .write_all(&bytes)
            .and_then(|()| archive_file.flush())
            .map_err(|e| CacheError::io(archive_file.path(), e))?;
        info!(
            "Downloaded {} bytes to {:?}",
            bytes.len(),
            archive_file.path()
        );

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| CacheError::io(&self.root, e))?;

        let archive_path = archive_file.path().to_path_buf();
        let staging_path = staging.path().to_path_buf();
        let kind = descriptor.archive_kind;
        let content = tokio::task::spawn_blocking(move || {
            archive::extract(&archive_path, kind, &staging_path)?;
            archive::content_root(&staging_path)
        })
        .await
        .map_err(|e| CacheError::Extract {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })?
        .map_err(|e| CacheError::Extract {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })?;

        let dest = self.entry_path(identifier);
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| CacheError::io(&dest, e))?;
        }
        fs::rename(&content, &dest).map_err(|e| CacheError::io(&dest, e))?;

        let dir = dir_name(identifier);
        if dir != identifier {
            let marker = self.identifier_file(&dir);
            fs::write(&marker, identifier).map_err(|e| CacheError::io(&marker, e))?;
        }

        // The archive temp file and what is left of staging go away on drop
        drop(archive_file);
        drop(staging);

        info!("Extracted {} to {:?}", identifier, dest);
        Ok(dest)
    }
}

/// Directory name for an identifier; registry identifiers `ns:version`
/// become `ns_version`.
pub fn dir_name(identifier: &str) -> String {
    identifier.replace([':', '/', '\\'], "_")
}
