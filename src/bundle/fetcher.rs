//! Fetcher trait for downloading manifests and release archives

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use crate::bundle::error::FetchError;
use crate::bundle::types::SecretToken;
use crate::config::NetworkConfig;

/// Trait for fetching raw bytes from a URL
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the body at `url`
    ///
    /// # Arguments
    /// * `url` - Absolute URL of the resource
    /// * `credential` - Optional bearer token for private repositories
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - Response body of a 2xx response
    /// * `Err(FetchError)` - On transport failure or non-success status
    async fn fetch<'a>(
        &self,
        url: &str,
        credential: Option<&'a SecretToken>,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a reqwest client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a client with the configured user agent and timeout
    pub fn new(config: &NetworkConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch<'a>(
        &self,
        url: &str,
        credential: Option<&'a SecretToken>,
    ) -> Result<Vec<u8>, FetchError> {
        debug!("GET {} (authenticated: {})", url, credential.is_some());

        let mut request = self.client.get(url);
        if let Some(token) = credential {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("{} returned status {}", url, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
