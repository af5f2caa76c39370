use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::registry::credentials::Credential;

// =============================================================================
// Network constants
// =============================================================================

/// Timeout for every HTTP request in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("lspotato/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// LSCherry bundle constants
// =============================================================================

/// Release download root for LSCherry archives
pub const LSCHERRY_DL_URL: &str = "https://github.com/lvoxx/LSCherry/releases/download";

/// Folder created under the temp directory that holds one subfolder per version
pub const LSCHERRY_ROOT_FOLDER: &str = "LS Cherry";

/// Blend files accepted as the bundle's content root file, in lookup order
pub const LSCHERRY_BLEND_FILES: &[&str] = &["LS Cherry.local.blend", "LS Cherry.blend"];

/// Object linked out of the bundle blend file
pub const CHERRY_OBJECT: &str = "Cherry";

/// Link table owner for LSCherry links
pub const LSCHERRY_OWNER: &str = "LSCherry";

// =============================================================================
// LSRegistry constants
// =============================================================================

/// Central pointer repository holding one `registry.yaml` per namespace
pub const DEFAULT_POINTER_BASE_URL: &str = "https://raw.githubusercontent.com/lvoxx/LSRegistry/main";

/// Raw content host used for creator manifests
pub const DEFAULT_RAW_CONTENT_URL: &str = "https://raw.githubusercontent.com";

/// Host serving release assets
pub const DEFAULT_RELEASE_BASE_URL: &str = "https://github.com";

/// GitHub API root used by the update check
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Repository whose latest release is compared against the running version
pub const UPDATE_REPOSITORY: &str = "lvoxx/LSPotato";

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "LSPOTATO_CACHE_DIR";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub registry: RegistryConfig,
    pub credentials: Vec<Credential>,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Cache root; defaults to `<temp>/LS Cherry`
    pub root: Option<PathBuf>,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_ms: FETCH_TIMEOUT_MS,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Remote locations used by the namespace registry
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    pub pointer_base_url: String,
    pub raw_content_url: String,
    pub release_base_url: String,
    pub github_api_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pointer_base_url: DEFAULT_POINTER_BASE_URL.to_string(),
            raw_content_url: DEFAULT_RAW_CONTENT_URL.to_string(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolve the cache root: environment override, then config, then the
    /// temp-directory default.
    pub fn cache_root(&self) -> PathBuf {
        cache_root_with_env(std::env::var(CACHE_DIR_ENV).ok(), self.cache.root.clone())
    }
}

/// Returns the path to the data directory for lspotato.
/// Uses $XDG_DATA_HOME/lspotato if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/lspotato,
/// or ./lspotato if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the configuration file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("lspotato.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("lspotato")
}

fn cache_root_with_env(env_override: Option<String>, configured: Option<PathBuf>) -> PathBuf {
    env_override
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or(configured)
        .unwrap_or_else(|| std::env::temp_dir().join(LSCHERRY_ROOT_FOLDER))
}
