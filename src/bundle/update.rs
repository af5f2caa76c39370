//! Self update check against the latest GitHub release

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::bundle::error::UpdateError;
use crate::bundle::fetcher::Fetcher;
use crate::bundle::semver::{CompareResult, compare_versions};
use crate::config::UPDATE_REPOSITORY;

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatus {
    pub current: String,
    pub latest: String,
    pub status: CompareResult,
}

impl UpdateStatus {
    pub fn update_available(&self) -> bool {
        self.status == CompareResult::Outdated
    }
}

pub struct UpdateChecker {
    fetcher: Arc<dyn Fetcher>,
    api_url: String,
}

impl UpdateChecker {
    pub fn new(fetcher: Arc<dyn Fetcher>, api_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_url: api_url.into(),
        }
    }

    /// Compare `current` against the tag of the latest release
    pub async fn check(&self, current: &str) -> Result<UpdateStatus, UpdateError> {
        let url = format!(
            "{}/repos/{}/releases/latest",
            self.api_url.trim_end_matches('/'),
            UPDATE_REPOSITORY
        );
        debug!("Checking for updates at {}", url);

        let body = self.fetcher.fetch(&url, None).await?;
        let release: LatestRelease = serde_json::from_slice(&body)
            .map_err(|e| UpdateError::InvalidResponse(e.to_string()))?;

        let status = compare_versions(current, &release.tag_name);
        info!(
            "Current version {}, latest release {} ({:?})",
            current, release.tag_name, status
        );

        Ok(UpdateStatus {
            current: current.to_string(),
            latest: release.tag_name,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fetcher::HttpFetcher;
    use crate::config::NetworkConfig;
    use mockito::Server;
    use rstest::rstest;

    fn checker(server: &mockito::ServerGuard) -> UpdateChecker {
        let fetcher = Arc::new(HttpFetcher::new(&NetworkConfig::default()).unwrap());
        UpdateChecker::new(fetcher, server.url())
    }

    #[rstest]
    #[case("1.2.0", CompareResult::Outdated)]
    #[case("1.3.0", CompareResult::Latest)]
    #[case("1.4.0", CompareResult::Newer)]
    #[tokio::test]
    async fn check_compares_against_latest_tag(
        #[case] current: &str,
        #[case] expected: CompareResult,
    ) {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/lvoxx/LSPotato/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name": "v1.3.0", "name": "LSPotato 1.3.0"}"#)
            .create_async()
            .await;

        let status = checker(&server).check(current).await.unwrap();

        mock.assert_async().await;
        assert_eq!(status.latest, "v1.3.0");
        assert_eq!(status.status, expected);
        assert_eq!(status.update_available(), expected == CompareResult::Outdated);
    }

    #[tokio::test]
    async fn check_rejects_response_without_tag() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/lvoxx/LSPotato/releases/latest")
            .with_status(200)
            .with_body(r#"{"name": "no tag"}"#)
            .create_async()
            .await;

        let result = checker(&server).check("1.0.0").await;

        assert!(matches!(result, Err(UpdateError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn check_reports_http_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/lvoxx/LSPotato/releases/latest")
            .with_status(403)
            .create_async()
            .await;

        let result = checker(&server).check("1.0.0").await;

        assert!(matches!(result, Err(UpdateError::Fetch(e)) if e.status() == Some(403)));
    }
}
