//! Link registry
//!
//! Tracks the external references one subsystem (an *owner*) holds in the
//! document. A version switch first drops references to other versions
//! (`reconcile`), then links or relocates the anchor (`establish`). Repair
//! finds references whose backing file vanished, re-materializes the
//! content and relocates them.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::bundle::cache::ArchiveCache;
use crate::bundle::resolver::DescriptorSource;
use crate::bundle::types::VersionDescriptor;
use crate::link::error::LinkError;
use crate::link::host::{ExternalRef, LinkHost};
use crate::link::path;
use crate::link::store::LinkStore;
use crate::link::types::{Anchor, LinkRecord, RepairIssue, RepairReport};

/// Extension of files the host can link from
pub const DEFAULT_LINK_EXTENSION: &str = "blend";

pub struct LinkRegistry {
    store: Arc<dyn LinkStore>,
    host: Arc<dyn LinkHost>,
    document_dir: PathBuf,
    owner: String,
    extension: String,
}

impl LinkRegistry {
    pub fn new(
        store: Arc<dyn LinkStore>,
        host: Arc<dyn LinkHost>,
        document_dir: impl Into<PathBuf>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            store,
            host,
            document_dir: document_dir.into(),
            owner: owner.into(),
            extension: DEFAULT_LINK_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn document_dir(&self) -> &Path {
        &self.document_dir
    }

    /// Every record held by this owner
    pub fn current_links(&self) -> Result<Vec<LinkRecord>, LinkError> {
        Ok(self.store.records(&self.owner)?)
    }

    /// Absolute location of a record's backing file
    pub fn backing_file(&self, record: &LinkRecord) -> PathBuf {
        path::resolve(&record.backing_path, &self.document_dir)
    }

    /// A record is broken when its backing file is gone or is not a
    /// linkable file.
    pub fn is_broken(&self, record: &LinkRecord) -> bool {
        !self.is_linkable(&self.backing_file(record))
    }

    /// Linkable file for `anchor` inside `content_root`.
    ///
    /// The anchor's source file must be a plain relative path that stays
    /// within `content_root`.
    pub fn source_path(&self, content_root: &Path, anchor: &Anchor) -> Result<PathBuf, LinkError> {
        let relative = Path::new(&anchor.source_file);
        let enclosed = relative.components().next().is_some()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !enclosed {
            return Err(LinkError::UnsafeSource(anchor.source_file.clone()));
        }

        let source = content_root.join(relative);
        if !self.is_linkable(&source) {
            return Err(LinkError::MissingSource(source));
        }
        Ok(source)
    }

    /// Drop every reference whose identifier differs from `new_identifier`.
    ///
    /// Returns the identifier of the first removed record, or `None` when
    /// nothing had to be removed.
    pub fn reconcile(&self, new_identifier: &str) -> Result<Option<String>, LinkError> {
        let mut previous = None;

        for record in self.current_links()? {
            if record.identifier == new_identifier {
                continue;
            }

            if let Err(e) = self.host.remove(&self.external_ref(&record)) {
                warn!(
                    "Failed to remove {} from the document: {}",
                    record.host_ref, e
                );
            }
            self.store.remove(&self.owner, &record.anchor_name)?;
            info!(
                "Unlinked {} version {} from {}",
                self.owner, record.identifier, record.anchor_name
            );

            previous.get_or_insert(record.identifier);
        }

        Ok(previous)
    }

    /// Make `anchor` reference `anchor.source_file` inside `content_root`.
    ///
    /// An empty slot gets a fresh link. An occupied slot pointing elsewhere,
    /// at another identifier, or at a missing file is relocated in place.
    /// A healthy slot that already matches is returned unchanged.
    pub fn establish(
        &self,
        descriptor: &VersionDescriptor,
        content_root: &Path,
        anchor: &Anchor,
    ) -> Result<LinkRecord, LinkError> {
        let source = self.source_path(content_root, anchor)?;

        let Some(existing) = self.store.get(&self.owner, &anchor.name)? else {
            return self.link_new(descriptor, anchor, &source);
        };

        let target = path::resolve(
            &path::to_document_relative(&source, &self.document_dir),
            &self.document_dir,
        );
        if self.backing_file(&existing) == target
            && existing.identifier == descriptor.identifier
            && !self.is_broken(&existing)
        {
            debug!(
                "{} already links {} from {:?}",
                anchor.name, existing.identifier, source
            );
            return Ok(existing);
        }

        self.relocate_record(&existing, descriptor, anchor, &source)
    }

    /// Records whose backing file is gone
    pub fn detect_broken(&self) -> Result<Vec<LinkRecord>, LinkError> {
        let broken: Vec<LinkRecord> = self
            .current_links()?
            .into_iter()
            .filter(|record| self.is_broken(record))
            .collect();

        if !broken.is_empty() {
            debug!("{} broken link(s) for {}", broken.len(), self.owner);
        }
        Ok(broken)
    }

    /// Re-download the content behind every broken record and relocate the
    /// records to it.
    ///
    /// Records are grouped by identifier so each version is fetched once.
    /// Unresolvable identifiers are skipped; per-record failures are
    /// collected in the report.
    pub async fn repair_all(
        &self,
        cache: &ArchiveCache,
        source: &dyn DescriptorSource,
    ) -> Result<RepairReport, LinkError> {
        let mut report = RepairReport::default();

        let mut groups: IndexMap<String, Vec<LinkRecord>> = IndexMap::new();
        for record in self.detect_broken()? {
            groups
                .entry(record.identifier.clone())
                .or_default()
                .push(record);
        }

        for (identifier, records) in groups {
            let descriptor = match source.descriptor(&identifier).await {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!("Skipping repair of {}: {}", identifier, e);
                    report
                        .skipped
                        .extend(records.iter().map(|r| issue(r, e.to_string())));
                    continue;
                }
            };

            let content_root = match cache.repair(&descriptor).await {
                Ok(path) => path,
                Err(e) => {
                    error!("Failed to repair {}: {}", identifier, e);
                    report
                        .failed
                        .extend(records.iter().map(|r| issue(r, e.to_string())));
                    continue;
                }
            };

            for record in records {
                let anchor = record.anchor();
                let relocated = self
                    .source_path(&content_root, &anchor)
                    .and_then(|source| self.relocate_record(&record, &descriptor, &anchor, &source));
                match relocated {
                    Ok(_) => report.repaired += 1,
                    Err(e) => {
                        error!("Failed to relink {}: {}", record.anchor_name, e);
                        report.failed.push(issue(&record, e.to_string()));
                    }
                }
            }
        }

        info!(
            "Repair of {}: {} repaired, {} skipped, {} failed",
            self.owner,
            report.repaired,
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Remove every record of this owner; returns how many were removed
    pub fn clear(&self) -> Result<usize, LinkError> {
        let records = self.current_links()?;
        for record in &records {
            if let Err(e) = self.host.remove(&self.external_ref(record)) {
                warn!(
                    "Failed to remove {} from the document: {}",
                    record.host_ref, e
                );
            }
            self.store.remove(&self.owner, &record.anchor_name)?;
        }
        info!("Removed {} link(s) owned by {}", records.len(), self.owner);
        Ok(records.len())
    }

    fn link_new(
        &self,
        descriptor: &VersionDescriptor,
        anchor: &Anchor,
        source: &Path,
    ) -> Result<LinkRecord, LinkError> {
        let reference = self.host.link_object(source, &anchor.object_name)?;
        let record = self.record_for(descriptor, anchor, &reference);

        if let Err(e) = self.store.upsert(&record) {
            if let Err(rollback) = self.host.remove(&reference) {
                warn!("Failed to roll back link {}: {}", reference.handle, rollback);
            }
            return Err(e.into());
        }

        info!(
            "Linked {} version {} into {} ({})",
            self.owner, descriptor.identifier, anchor.name, record.backing_path
        );
        Ok(record)
    }

    fn relocate_record(
        &self,
        existing: &LinkRecord,
        descriptor: &VersionDescriptor,
        anchor: &Anchor,
        source: &Path,
    ) -> Result<LinkRecord, LinkError> {
        let reference = self.host.relocate(&self.external_ref(existing), source)?;
        let record = self.record_for(descriptor, anchor, &reference);
        self.store.upsert(&record)?;

        info!(
            "Relocated {} from {} to {} ({})",
            anchor.name, existing.identifier, descriptor.identifier, record.backing_path
        );
        Ok(record)
    }

    fn record_for(
        &self,
        descriptor: &VersionDescriptor,
        anchor: &Anchor,
        reference: &ExternalRef,
    ) -> LinkRecord {
        LinkRecord {
            owner: self.owner.clone(),
            anchor_name: anchor.name.clone(),
            identifier: descriptor.identifier.clone(),
            source_file: anchor.source_file.clone(),
            object_name: anchor.object_name.clone(),
            backing_path: path::to_document_relative(&reference.file, &self.document_dir),
            host_ref: reference.handle.clone(),
            // The link table keeps millisecond precision
            linked_at: Utc::now().trunc_subsecs(3),
        }
    }

    fn external_ref(&self, record: &LinkRecord) -> ExternalRef {
        ExternalRef {
            handle: record.host_ref.clone(),
            file: self.backing_file(record),
        }
    }

    fn is_linkable(&self, file: &Path) -> bool {
        file.is_file()
            && file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

fn issue(record: &LinkRecord, reason: String) -> RepairIssue {
    RepairIssue {
        anchor_name: record.anchor_name.clone(),
        identifier: record.identifier.clone(),
        reason,
    }
}
