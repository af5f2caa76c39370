//! Registry manifests
//!
//! Resolution reads two YAML documents. The pointer manifest
//! (`registry.yaml`) lives in the central registry repository and names the
//! creator's repository. The creator manifest (`registry.ls.yaml`) lives in
//! that repository and lists released versions plus the objects to link.
//!
//! ```yaml
//! # registry.yaml
//! metadata:
//!   user: acme
//!   repository: pack-repo
//!   branch: main
//!   credentails: none
//!
//! # registry.ls.yaml
//! versions:
//!   1.0.0:
//!     tag: v1.0.0
//!     release-file: pack.zip
//! linked-objects-in-files:
//!   pack.blend: Tree
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::registry::error::RegistryError;

/// File name of the pointer manifest
pub const POINTER_FILE: &str = "registry.yaml";

/// File name of the creator manifest
pub const CREATOR_FILE: &str = "registry.ls.yaml";

/// Credentials mode meaning the creator repository is public
pub const CREDENTIALS_NONE: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PointerManifest {
    pub metadata: PointerMetadata,
}

/// Coordinates of the creator repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PointerMetadata {
    pub user: String,
    pub repository: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Published manifests spell the key `credentails`; both spellings work
    #[serde(default = "default_credentials", alias = "credentails")]
    pub credentials: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl PointerMetadata {
    pub fn requires_credential(&self) -> bool {
        !self.credentials.eq_ignore_ascii_case(CREDENTIALS_NONE)
    }
}

fn default_platform() -> String {
    "github".to_string()
}

fn default_credentials() -> String {
    CREDENTIALS_NONE.to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

/// Release coordinates of one version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionEntry {
    pub tag: String,
    #[serde(rename = "release-file")]
    pub release_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatorManifest {
    #[serde(default, deserialize_with = "scalar_keys")]
    pub versions: IndexMap<String, VersionEntry>,
    /// Blend file inside the release archive -> object to link from it
    #[serde(default, rename = "linked-objects-in-files")]
    pub linked_objects: IndexMap<String, String>,
}

/// Version keys such as `2` or `1.5` arrive as YAML numbers
fn scalar_keys<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw = IndexMap::<serde_yaml::Value, V>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "unsupported version key: {other:?}"
                    )));
                }
            };
            Ok((key, value))
        })
        .collect()
}

impl PointerManifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, RegistryError> {
        serde_yaml::from_slice(bytes).map_err(|e| RegistryError::MalformedMetadata {
            file: POINTER_FILE.to_string(),
            reason: e.to_string(),
        })
    }
}

impl CreatorManifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, RegistryError> {
        serde_yaml::from_slice(bytes).map_err(|e| RegistryError::MalformedMetadata {
            file: CREATOR_FILE.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Both manifest stages for one namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryManifest {
    pub namespace: String,
    pub pointer: PointerMetadata,
    pub creator: CreatorManifest,
}

impl RegistryManifest {
    pub fn version(&self, version: &str) -> Result<&VersionEntry, RegistryError> {
        self.creator
            .versions
            .get(version)
            .ok_or_else(|| RegistryError::VersionNotFound {
                namespace: self.namespace.clone(),
                version: version.to_string(),
            })
    }

    /// Download URL of the release asset for `version`
    pub fn release_url(&self, release_base: &str, version: &str) -> Result<String, RegistryError> {
        let entry = self.version(version)?;
        Ok(format!(
            "{}/{}/{}/releases/download/{}/{}",
            release_base.trim_end_matches('/'),
            self.pointer.user,
            self.pointer.repository,
            entry.tag,
            entry.release_file
        ))
    }

    pub fn linked_objects(&self) -> &IndexMap<String, String> {
        &self.creator.linked_objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const POINTER: &str = r#"
metadata:
  user: acme
  repository: pack-repo
  branch: main
  credentails: none
"#;

    const CREATOR: &str = r#"
versions:
  1.0.0:
    tag: v1.0.0
    release-file: pack.zip
  "1.1":
    tag: v1.1
    release-file: pack-1.1.zip
linked-objects-in-files:
  trees.blend: Tree
  rocks.blend: Rock
"#;

    fn manifest() -> RegistryManifest {
        RegistryManifest {
            namespace: "io.github.acme.pack".to_string(),
            pointer: PointerManifest::parse(POINTER.as_bytes()).unwrap().metadata,
            creator: CreatorManifest::parse(CREATOR.as_bytes()).unwrap(),
        }
    }

    #[test]
    fn pointer_defaults_missing_fields() {
        let pointer = PointerManifest::parse(b"metadata:\n  user: acme\n  repository: r\n")
            .unwrap()
            .metadata;

        assert_eq!(pointer.platform, "github");
        assert_eq!(pointer.branch, "main");
        assert_eq!(pointer.credentials, "none");
        assert!(!pointer.requires_credential());
    }

    #[rstest]
    #[case("credentails: private", true)]
    #[case("credentials: private", true)]
    #[case("credentials: none", false)]
    #[case("credentials: NONE", false)]
    fn pointer_accepts_both_credential_spellings(#[case] line: &str, #[case] expected: bool) {
        let yaml = format!("metadata:\n  user: acme\n  repository: r\n  {line}\n");
        let pointer = PointerManifest::parse(yaml.as_bytes()).unwrap().metadata;
        assert_eq!(pointer.requires_credential(), expected);
    }

    #[test]
    fn pointer_without_repository_is_malformed() {
        let result = PointerManifest::parse(b"metadata:\n  user: acme\n");
        assert!(matches!(
            result,
            Err(RegistryError::MalformedMetadata { file, .. }) if file == POINTER_FILE
        ));
    }

    #[test]
    fn creator_keeps_linked_objects_in_file_order() {
        let manifest = manifest();
        let files: Vec<&str> = manifest.linked_objects().keys().map(String::as_str).collect();
        assert_eq!(files, vec!["trees.blend", "rocks.blend"]);
    }

    #[test]
    fn creator_accepts_numeric_version_keys() {
        let creator = CreatorManifest::parse(b"versions:\n  2:\n    tag: v2\n    release-file: a.zip\n")
            .unwrap();
        assert!(creator.versions.contains_key("2"));
        assert!(creator.linked_objects.is_empty());
    }

    #[test]
    fn release_url_joins_coordinates() {
        let url = manifest()
            .release_url("https://github.com", "1.0.0")
            .unwrap();
        assert_eq!(
            url,
            "https://github.com/acme/pack-repo/releases/download/v1.0.0/pack.zip"
        );
    }

    #[test]
    fn release_url_for_unknown_version_fails() {
        let result = manifest().release_url("https://github.com", "9.9.9");
        assert!(matches!(
            result,
            Err(RegistryError::VersionNotFound { version, .. }) if version == "9.9.9"
        ));
    }
}
