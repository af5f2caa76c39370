//! Namespace registry
//!
//! Third-party bundles are addressed as `namespace:version`. A namespace
//! such as `io.github.acme.pack` maps to `io/github/acme/pack/registry.yaml`
//! in the central registry repository, which points at the creator's own
//! repository and its `registry.ls.yaml`.
//!
//! # Modules
//!
//! - [`credentials`]: Per-namespace tokens for private repositories
//! - [`error`]: Registry error type
//! - [`install`]: Batch install, removal and repair of registry packages
//! - [`manifest`]: YAML manifest types
//! - [`resolver`]: Two-stage manifest resolution

pub mod credentials;
pub mod error;
pub mod install;
pub mod manifest;
pub mod resolver;

use crate::registry::error::RegistryError;

/// Directory under the document holding extracted registry packages
pub const REGISTRY_DIR: &str = "registry";

/// Directory under [`REGISTRY_DIR`] holding the saved manifests
pub const METADATA_DIR: &str = "metadata";

/// Link table owner prefix; the namespace follows it
pub const REGISTRY_OWNER_PREFIX: &str = "lsregistry:";

/// Join a namespace and a version into a registry identifier
pub fn identifier(namespace: &str, version: &str) -> String {
    format!("{namespace}:{version}")
}

/// Split `namespace:version` at the first colon
pub fn split_identifier(identifier: &str) -> Result<(&str, &str), RegistryError> {
    match identifier.split_once(':') {
        Some((namespace, version)) if !namespace.is_empty() && !version.is_empty() => {
            Ok((namespace, version))
        }
        _ => Err(RegistryError::InvalidIdentifier(identifier.to_string())),
    }
}

/// Link table owner of a namespace
pub fn owner(namespace: &str) -> String {
    format!("{REGISTRY_OWNER_PREFIX}{namespace}")
}
