//! Document directory, cache root and collaborators wired for tests

use std::path::PathBuf;
use std::sync::Arc;

use mockito::{Mock, ServerGuard};
use tempfile::TempDir;

use lspotato::bundle::cache::ArchiveCache;
use lspotato::bundle::catalog::VersionCatalog;
use lspotato::bundle::fetcher::{Fetcher, HttpFetcher};
use lspotato::bundle::manager::BundleManager;
use lspotato::config::{LSCHERRY_OWNER, NetworkConfig, RegistryConfig};
use lspotato::link::host::{HeadlessHost, LinkHost};
use lspotato::link::registry::LinkRegistry;
use lspotato::link::store::{LinkStore, SqliteLinkStore};
use lspotato::registry::credentials::{Credential, CredentialTable};
use lspotato::registry::install::RegistryInstaller;
use lspotato::registry::resolver::RegistryResolver;
use lspotato::registry::{METADATA_DIR, REGISTRY_DIR};

use super::archive::cherry_archive;

pub struct Workspace {
    pub temp: TempDir,
    pub document_dir: PathBuf,
    pub cache_root: PathBuf,
    pub store: Arc<dyn LinkStore>,
    pub host: Arc<dyn LinkHost>,
    pub fetcher: Arc<dyn Fetcher>,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let document_dir = temp.path().join("project");
        std::fs::create_dir_all(&document_dir).unwrap();
        let store = SqliteLinkStore::open(&temp.path().join("links.db")).unwrap();

        Self {
            cache_root: temp.path().join("LS Cherry"),
            document_dir,
            temp,
            store: Arc::new(store),
            host: Arc::new(HeadlessHost),
            fetcher: Arc::new(HttpFetcher::new(&NetworkConfig::default()).unwrap()),
        }
    }

    /// Bundle manager whose catalog serves `versions` from `server`
    pub fn bundle_manager(&self, server: &ServerGuard, versions: &[&str]) -> BundleManager {
        let catalog = VersionCatalog::from_entries(versions.iter().map(|version| {
            (
                version.to_string(),
                format!("{}/lscherry-v{version}/LSCherry-{version}.zip", server.url()),
            )
        }));
        let cache = ArchiveCache::new(&self.cache_root, self.fetcher.clone()).unwrap();
        let links = LinkRegistry::new(
            self.store.clone(),
            self.host.clone(),
            self.document_dir.clone(),
            LSCHERRY_OWNER,
        );
        BundleManager::new(catalog, cache, links)
    }

    /// Registry installer whose every remote location is `server`
    pub fn registry_installer(
        &self,
        server: &ServerGuard,
        credentials: Vec<Credential>,
    ) -> RegistryInstaller {
        let registry_dir = self.document_dir.join(REGISTRY_DIR);
        let config = RegistryConfig {
            pointer_base_url: format!("{}/lvoxx/LSRegistry/main", server.url()),
            raw_content_url: server.url(),
            release_base_url: server.url(),
            github_api_url: server.url(),
        };
        let resolver = RegistryResolver::new(
            self.fetcher.clone(),
            config,
            CredentialTable::new(credentials),
            registry_dir.join(METADATA_DIR),
        );
        let cache = ArchiveCache::new(registry_dir, self.fetcher.clone())
            .unwrap()
            .with_reserved(METADATA_DIR);
        RegistryInstaller::new(
            Arc::new(resolver),
            cache,
            self.store.clone(),
            self.host.clone(),
            self.document_dir.clone(),
        )
    }
}

/// Serve the LSCherry archive of `version`, expecting `hits` downloads
pub async fn mock_cherry_release(server: &mut ServerGuard, version: &str, hits: usize) -> Mock {
    server
        .mock(
            "GET",
            format!("/lscherry-v{version}/LSCherry-{version}.zip").as_str(),
        )
        .with_status(200)
        .with_body(cherry_archive(version))
        .expect(hits)
        .create_async()
        .await
}
