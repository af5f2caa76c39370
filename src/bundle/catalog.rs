//! Static LSCherry version catalog

use indexmap::IndexMap;

use crate::bundle::error::CatalogError;
use crate::bundle::resolver::DescriptorSource;
use crate::bundle::semver::sort_newest_first;
use crate::bundle::types::VersionDescriptor;
use crate::config::LSCHERRY_DL_URL;
use crate::error::Error;

/// Symbolic identifier resolving to the newest known version
pub const LATEST: &str = "latest";

/// Released LSCherry versions
const LSCHERRY_VERSIONS: &[&str] = &[
    "1.2.1",
    "1.2.0",
    "1.1.5.1",
    "1.1.5",
    "1.1.4",
    "1.1.3",
    "1.1.2",
    "1.1.1",
    "1.1.0",
    "1.0.5",
    "1.0.4",
    "1.0.3.1",
    "1.0.3",
    "1.0.2",
    "1.0.1",
    "1.0.0-beta.2",
    "1.0.0-beta.1",
];

/// Fixed mapping from version identifier to download URL
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    entries: IndexMap<String, String>,
}

impl VersionCatalog {
    /// The LSCherry release table
    pub fn builtin() -> Self {
        Self::from_entries(LSCHERRY_VERSIONS.iter().map(|version| {
            (
                version.to_string(),
                format!("{LSCHERRY_DL_URL}/lscherry-v{version}/LSCherry-{version}.rar"),
            )
        }))
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// All identifiers, newest first
    pub fn list(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.entries.keys().cloned().collect();
        sort_newest_first(&mut versions);
        versions
    }

    /// The newest identifier in the catalog
    pub fn latest(&self) -> Option<String> {
        self.list().into_iter().next()
    }

    /// Resolve an identifier (or `latest`) to a descriptor
    pub fn resolve(&self, identifier: &str) -> Result<VersionDescriptor, CatalogError> {
        let identifier = if identifier == LATEST {
            self.latest()
                .ok_or_else(|| CatalogError::NotFound(identifier.to_string()))?
        } else {
            identifier.to_string()
        };

        let url = self
            .entries
            .get(&identifier)
            .ok_or_else(|| CatalogError::NotFound(identifier.clone()))?;

        Ok(VersionDescriptor::new(identifier, url.clone()))
    }
}

#[async_trait::async_trait]
impl DescriptorSource for VersionCatalog {
    async fn descriptor(&self, identifier: &str) -> Result<VersionDescriptor, Error> {
        Ok(self.resolve(identifier)?)
    }
}
