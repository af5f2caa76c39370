//! Per-namespace access tokens for private registries

use serde::Deserialize;

use crate::bundle::types::SecretToken;

/// Token configured for one namespace
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub namespace: String,
    pub token: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("namespace", &self.namespace)
            .field("token", &"***")
            .finish()
    }
}

/// Lookup table of configured credentials
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    credentials: Vec<Credential>,
}

impl CredentialTable {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    /// Token for `namespace`; only exact matches count and empty tokens are
    /// treated as absent.
    pub fn token_for(&self, namespace: &str) -> Option<SecretToken> {
        self.credentials
            .iter()
            .find(|c| c.namespace == namespace)
            .filter(|c| !c.token.is_empty())
            .map(|c| SecretToken::new(c.token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CredentialTable {
        CredentialTable::new(vec![
            Credential {
                namespace: "io.github.acme.pack".to_string(),
                token: "ghp_secret".to_string(),
            },
            Credential {
                namespace: "io.github.acme.empty".to_string(),
                token: String::new(),
            },
        ])
    }

    #[test]
    fn token_for_matches_exact_namespace() {
        let token = table().token_for("io.github.acme.pack").unwrap();
        assert_eq!(token.expose(), "ghp_secret");
    }

    #[test]
    fn token_for_ignores_prefix_matches_and_empty_tokens() {
        assert!(table().token_for("io.github.acme").is_none());
        assert!(table().token_for("io.github.acme.empty").is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let debug = format!("{:?}", table());
        assert!(!debug.contains("ghp_secret"));
    }
}
