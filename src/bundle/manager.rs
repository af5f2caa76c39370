//! LSCherry lifecycle: get, remap, repair, status and purge

use std::path::Path;

use tracing::info;

use crate::bundle::cache::ArchiveCache;
use crate::bundle::catalog::VersionCatalog;
use crate::bundle::types::{CacheEntry, VersionDescriptor};
use crate::config::{CHERRY_OBJECT, LSCHERRY_BLEND_FILES};
use crate::error::Error;
use crate::link::error::LinkError;
use crate::link::registry::LinkRegistry;
use crate::link::types::{Anchor, LinkRecord, RepairReport};

/// Anchor holding the Cherry object
pub const CHERRY_ANCHOR: &str = "Cherry";

/// Result of switching the document to a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOutcome {
    /// Version that was linked before, if it differed
    pub previous: Option<String>,
    pub record: LinkRecord,
}

/// A link together with its health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub record: LinkRecord,
    pub broken: bool,
}

pub struct BundleManager {
    catalog: VersionCatalog,
    cache: ArchiveCache,
    links: LinkRegistry,
}

impl BundleManager {
    pub fn new(catalog: VersionCatalog, cache: ArchiveCache, links: LinkRegistry) -> Self {
        Self {
            catalog,
            cache,
            links,
        }
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    pub fn cached(&self) -> Result<Vec<CacheEntry>, Error> {
        Ok(self.cache.entries()?)
    }

    /// Link `version` into the document, replacing any other version.
    ///
    /// Resolution, download and extraction happen before existing links
    /// are touched.
    pub async fn get(&self, version: &str) -> Result<GetOutcome, Error> {
        let (descriptor, content_root) = self.materialize(version).await?;
        let anchor = cherry_anchor(&content_root)?;

        let previous = self.links.reconcile(&descriptor.identifier)?;
        let record = self.links.establish(&descriptor, &content_root, &anchor)?;

        match &previous {
            Some(old) => info!("Changed LSCherry {} to {}", old, descriptor.identifier),
            None => info!("Linked LSCherry {}", descriptor.identifier),
        }
        Ok(GetOutcome { previous, record })
    }

    /// Point the existing Cherry link at `version` in place
    pub async fn remap(&self, version: &str) -> Result<LinkRecord, Error> {
        let (descriptor, content_root) = self.materialize(version).await?;
        let anchor = cherry_anchor(&content_root)?;
        Ok(self.links.establish(&descriptor, &content_root, &anchor)?)
    }

    pub async fn repair(&self) -> Result<RepairReport, Error> {
        Ok(self.links.repair_all(&self.cache, &self.catalog).await?)
    }

    pub fn status(&self) -> Result<Vec<LinkStatus>, Error> {
        Ok(self
            .links
            .current_links()?
            .into_iter()
            .map(|record| LinkStatus {
                broken: self.links.is_broken(&record),
                record,
            })
            .collect())
    }

    /// Delete every downloaded version. Links are kept and show up as
    /// broken until repaired.
    pub fn purge(&self) -> Result<(), Error> {
        Ok(self.cache.purge_all()?)
    }

    async fn materialize(
        &self,
        version: &str,
    ) -> Result<(VersionDescriptor, std::path::PathBuf), Error> {
        let descriptor = self.catalog.resolve(version)?;
        let content_root = self.cache.ensure(&descriptor).await?;
        Ok((descriptor, content_root))
    }
}

/// Anchor for the first bundle blend file present in `content_root`
fn cherry_anchor(content_root: &Path) -> Result<Anchor, LinkError> {
    LSCHERRY_BLEND_FILES
        .iter()
        .find(|file| content_root.join(file).is_file())
        .map(|file| Anchor::new(CHERRY_ANCHOR, *file, CHERRY_OBJECT))
        .ok_or_else(|| LinkError::MissingSource(content_root.join(LSCHERRY_BLEND_FILES[0])))
}
