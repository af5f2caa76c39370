use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bundle::fetcher::Fetcher;
use crate::bundle::resolver::DescriptorSource;
use crate::bundle::types::{SecretToken, VersionDescriptor};
use crate::config::RegistryConfig;
use crate::error::Error;
use crate::registry::credentials::CredentialTable;
use crate::registry::error::RegistryError;
use crate::registry::manifest::{
    CREATOR_FILE, CreatorManifest, POINTER_FILE, PointerManifest, RegistryManifest,
};
use crate::registry::{identifier, split_identifier};

/// A resolved namespace:version with the manifests it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub descriptor: VersionDescriptor,
    pub manifest: RegistryManifest,
}

/// Resolves `namespace:version` through the pointer and creator manifests
pub struct RegistryResolver {
    fetcher: Arc<dyn Fetcher>,
    config: RegistryConfig,
    credentials: CredentialTable,
    metadata_root: PathBuf,
}

impl RegistryResolver {
    /// `metadata_root` is `<documentDir>/registry/metadata`
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        config: RegistryConfig,
        credentials: CredentialTable,
        metadata_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            config,
            credentials,
            metadata_root: metadata_root.into(),
        }
    }

    /// Directory holding the saved manifests of `namespace`
    pub fn metadata_dir(&self, namespace: &str) -> PathBuf {
        self.metadata_root.join(namespace)
    }

    /// Fetch both manifests and build the descriptor for `version`.
    ///
    /// The manifests are saved locally once both fetches succeeded.
    pub async fn resolve(
        &self,
        namespace: &str,
        version: &str,
    ) -> Result<ResolvedPackage, RegistryError> {
        validate(namespace, version)?;

        let pointer_url = self.pointer_url(namespace);
        debug!("Fetching registry pointer {}", pointer_url);
        let pointer_bytes = self.fetcher.fetch(&pointer_url, None).await.map_err(|e| {
            RegistryError::MetadataNotFound {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            }
        })?;
        let pointer = PointerManifest::parse(&pointer_bytes)?.metadata;

        let credential = self.credential_for(namespace, pointer.requires_credential());
        let creator_url = format!(
            "{}/{}/{}/{}/{}",
            self.config.raw_content_url.trim_end_matches('/'),
            pointer.user,
            pointer.repository,
            pointer.branch,
            CREATOR_FILE
        );
        debug!("Fetching creator manifest {}", creator_url);
        let creator_bytes = self
            .fetcher
            .fetch(&creator_url, credential.as_ref())
            .await
            .map_err(|e| RegistryError::UpstreamMetadata {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })?;
        let creator = CreatorManifest::parse(&creator_bytes)?;

        self.save_metadata(namespace, &pointer_bytes, &creator_bytes)?;

        let manifest = RegistryManifest {
            namespace: namespace.to_string(),
            pointer,
            creator,
        };
        self.package(manifest, version, credential)
    }

    /// Build the descriptor from previously saved manifests, without network
    pub fn resolve_local(
        &self,
        namespace: &str,
        version: &str,
    ) -> Result<ResolvedPackage, RegistryError> {
        validate(namespace, version)?;

        let dir = self.metadata_dir(namespace);
        let pointer = PointerManifest::parse(&read_saved(namespace, &dir.join(POINTER_FILE))?)?;
        let creator = CreatorManifest::parse(&read_saved(namespace, &dir.join(CREATOR_FILE))?)?;

        let pointer = pointer.metadata;
        let credential = self.credential_for(namespace, pointer.requires_credential());
        let manifest = RegistryManifest {
            namespace: namespace.to_string(),
            pointer,
            creator,
        };
        self.package(manifest, version, credential)
    }

    fn pointer_url(&self, namespace: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.pointer_base_url.trim_end_matches('/'),
            namespace.replace('.', "/"),
            POINTER_FILE
        )
    }

    fn credential_for(&self, namespace: &str, required: bool) -> Option<SecretToken> {
        if !required {
            return None;
        }
        let token = self.credentials.token_for(namespace);
        if token.is_none() {
            warn!(
                "Registry {} is private but no credential is configured for it",
                namespace
            );
        }
        token
    }

    fn package(
        &self,
        manifest: RegistryManifest,
        version: &str,
        credential: Option<SecretToken>,
    ) -> Result<ResolvedPackage, RegistryError> {
        let url = manifest.release_url(&self.config.release_base_url, version)?;
        let descriptor = VersionDescriptor::new(identifier(&manifest.namespace, version), url)
            .with_credential(credential);
        Ok(ResolvedPackage {
            descriptor,
            manifest,
        })
    }

    fn save_metadata(
        &self,
        namespace: &str,
        pointer: &[u8],
        creator: &[u8],
    ) -> Result<(), RegistryError> {
        let dir = self.metadata_dir(namespace);
        fs::create_dir_all(&dir).map_err(|e| RegistryError::io(&dir, e))?;
        for (name, bytes) in [(POINTER_FILE, pointer), (CREATOR_FILE, creator)] {
            let path = dir.join(name);
            fs::write(&path, bytes).map_err(|e| RegistryError::io(&path, e))?;
        }
        info!("Saved registry metadata for {} to {:?}", namespace, dir);
        Ok(())
    }
}

fn validate(namespace: &str, version: &str) -> Result<(), RegistryError> {
    if namespace.is_empty() || version.is_empty() {
        return Err(RegistryError::InvalidIdentifier(identifier(namespace, version)));
    }
    Ok(())
}

fn read_saved(namespace: &str, path: &Path) -> Result<Vec<u8>, RegistryError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RegistryError::MetadataNotFound {
                namespace: namespace.to_string(),
                reason: format!("no saved metadata at {}", path.display()),
            })
        }
        Err(e) => Err(RegistryError::io(path, e)),
    }
}

#[async_trait::async_trait]
impl DescriptorSource for RegistryResolver {
    async fn descriptor(&self, identifier: &str) -> Result<VersionDescriptor, Error> {
        let (namespace, version) = split_identifier(identifier)?;

        match self.resolve_local(namespace, version) {
            Ok(package) => Ok(package.descriptor),
            Err(RegistryError::MetadataNotFound { .. }) => {
                debug!("No saved metadata for {}, resolving remotely", namespace);
                Ok(self.resolve(namespace, version).await?.descriptor)
            }
            Err(e) => Err(e.into()),
        }
    }
}
