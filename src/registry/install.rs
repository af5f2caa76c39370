//! Registry package installation
//!
//! Installs `namespace:version` packages into the document: resolve the
//! manifests, materialize the release under `<documentDir>/registry`, drop
//! links to other versions of the namespace and link every object listed
//! in `linked-objects-in-files`.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{error, info, warn};

use crate::bundle::cache::ArchiveCache;
use crate::error::Error;
use crate::link::error::LinkError;
use crate::link::host::LinkHost;
use crate::link::registry::LinkRegistry;
use crate::link::store::LinkStore;
use crate::link::types::{Anchor, LinkRecord, RepairReport};
use crate::registry::resolver::RegistryResolver;
use crate::registry::{REGISTRY_OWNER_PREFIX, identifier, owner};

static REQUEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*):([A-Za-z0-9][A-Za-z0-9._+-]*)$").unwrap()
});

/// One `namespace:version` line of an install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub namespace: String,
    pub version: String,
}

impl PackageRequest {
    pub fn identifier(&self) -> String {
        identifier(&self.namespace, &self.version)
    }
}

/// Parse multi-line input into requests.
///
/// Blank lines are ignored; lines that are not `namespace:version` are
/// returned separately.
pub fn parse_requests(input: &str) -> (Vec<PackageRequest>, Vec<String>) {
    let mut requests = Vec::new();
    let mut invalid = Vec::new();

    for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match REQUEST_RE.captures(line) {
            Some(caps) => requests.push(PackageRequest {
                namespace: caps[1].to_string(),
                version: caps[2].to_string(),
            }),
            None => invalid.push(line.to_string()),
        }
    }

    (requests, invalid)
}

/// An entry the batch did not install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallIssue {
    pub entry: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    /// Invalid or already installed entries
    pub skipped: Vec<InstallIssue>,
    pub failed: Vec<InstallIssue>,
}

pub struct RegistryInstaller {
    resolver: Arc<RegistryResolver>,
    cache: ArchiveCache,
    store: Arc<dyn LinkStore>,
    host: Arc<dyn LinkHost>,
    document_dir: PathBuf,
}

impl RegistryInstaller {
    /// `cache` is rooted at `<documentDir>/registry`
    pub fn new(
        resolver: Arc<RegistryResolver>,
        cache: ArchiveCache,
        store: Arc<dyn LinkStore>,
        host: Arc<dyn LinkHost>,
        document_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            cache,
            store,
            host,
            document_dir: document_dir.into(),
        }
    }

    fn links(&self, namespace: &str) -> LinkRegistry {
        LinkRegistry::new(
            self.store.clone(),
            self.host.clone(),
            self.document_dir.clone(),
            owner(namespace),
        )
    }

    /// Resolve, download and link one package.
    ///
    /// Links of other versions are only dropped once the release is on disk
    /// and at least one listed blend file was found in it.
    pub async fn install(&self, namespace: &str, version: &str) -> Result<Vec<LinkRecord>, Error> {
        let package = self.resolver.resolve(namespace, version).await?;
        let content_root = self.cache.ensure(&package.descriptor).await?;

        let links = self.links(namespace);
        let mut anchors = Vec::new();
        let mut first_rejected = None;
        for (file, object) in package.manifest.linked_objects() {
            let anchor = Anchor::new(format!("{file}/{object}"), file, object);
            match links.source_path(&content_root, &anchor) {
                Ok(_) => anchors.push(anchor),
                Err(e @ (LinkError::MissingSource(_) | LinkError::UnsafeSource(_))) => {
                    warn!("Skipping {}: {}", anchor.name, e);
                    first_rejected.get_or_insert(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if anchors.is_empty() {
            let e = first_rejected.unwrap_or(LinkError::MissingSource(content_root));
            return Err(e.into());
        }

        if let Some(previous) = links.reconcile(&package.descriptor.identifier)? {
            info!("Replacing {} with {}", previous, package.descriptor.identifier);
        }

        let mut records = Vec::with_capacity(anchors.len());
        for anchor in &anchors {
            records.push(links.establish(&package.descriptor, &content_root, anchor)?);
        }

        info!(
            "Installed {} with {} linked object(s)",
            package.descriptor.identifier,
            records.len()
        );
        Ok(records)
    }

    /// Install every `namespace:version` line of `input`.
    ///
    /// A failing entry is reported and the batch continues.
    pub async fn install_all(&self, input: &str) -> Result<InstallReport, Error> {
        let (requests, invalid) = parse_requests(input);
        let mut report = InstallReport::default();

        for line in invalid {
            warn!("Skipping invalid format: {}", line);
            report.skipped.push(InstallIssue {
                entry: line,
                reason: "expected namespace:version".to_string(),
            });
        }

        let mut installed: BTreeSet<String> = self.installed()?.into_iter().collect();
        for request in requests {
            let id = request.identifier();
            if installed.contains(&id) {
                info!("Registry {} is already installed, skipping", id);
                report.skipped.push(InstallIssue {
                    entry: id,
                    reason: "already installed".to_string(),
                });
                continue;
            }

            match self.install(&request.namespace, &request.version).await {
                Ok(_) => {
                    installed.insert(id.clone());
                    report.installed.push(id);
                }
                Err(e) => {
                    error!("Failed to install {}: {}", id, e);
                    report.failed.push(InstallIssue {
                        entry: id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Identifiers currently linked, across all namespaces
    pub fn installed(&self) -> Result<Vec<String>, Error> {
        let mut identifiers = BTreeSet::new();
        for owner in self.owners()? {
            for record in self.store.records(&owner).map_err(LinkError::from)? {
                identifiers.insert(record.identifier);
            }
        }
        Ok(identifiers.into_iter().collect())
    }

    /// Remove every link of `namespace`; returns how many were removed
    pub fn remove(&self, namespace: &str) -> Result<usize, Error> {
        Ok(self.links(namespace).clear()?)
    }

    /// Repair broken links of every installed namespace
    pub async fn repair(&self) -> Result<RepairReport, Error> {
        let mut report = RepairReport::default();
        for owner in self.owners()? {
            let Some(namespace) = owner.strip_prefix(REGISTRY_OWNER_PREFIX) else {
                continue;
            };
            let namespace_report = self
                .links(namespace)
                .repair_all(&self.cache, self.resolver.as_ref())
                .await?;
            report.merge(namespace_report);
        }
        Ok(report)
    }

    fn owners(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .store
            .owners(REGISTRY_OWNER_PREFIX)
            .map_err(LinkError::from)?)
    }
}
