//! Build-service API client
//!
//! A small authenticated client for the OBS-style source API: package
//! listings, subproject searches, and per-package file timestamps. All
//! operations return `Result` so "the project has no packages" and "the
//! request failed" stay distinguishable; transport failures are
//! recoverable (the detector turns them into per-package failures), parse
//! failures are fatal for the run.

mod cache;
mod xml;

pub use cache::TransportError;

use crate::config::ObsCredentials;
use crate::Timestamp;
use cache::{fetch_with_cache, FetchOutcome, ResponseCache};
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for build-service queries
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from build-service operations
#[derive(Debug, thiserror::Error)]
pub enum ObsError {
    /// Non-2xx status or connection error; recoverable per package
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed response body on an otherwise successful request; fatal
    #[error("malformed build-service response: {0}")]
    Parse(String),
}

impl From<ObsError> for crate::BundlewatchError {
    fn from(err: ObsError) -> Self {
        match err {
            ObsError::Transport(e) => crate::BundlewatchError::Network(e.to_string()),
            ObsError::Parse(msg) => crate::BundlewatchError::Parse(msg),
        }
    }
}

/// Build-service API client with HTTP Basic auth and a per-run response
/// cache
pub struct ObsClient {
    client: Client,
    api_url: String,
    credentials: ObsCredentials,
    cache: ResponseCache,
}

impl ObsClient {
    /// Create a new client for one API server.
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_url: impl Into<String>, credentials: ObsCredentials) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("bundlewatch/0.3"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            credentials,
            cache: ResponseCache::new(),
        })
    }

    /// The API base URL this client talks to
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// List all packages in a project.
    ///
    /// One GET to `/source/{project}`; the response root holds one
    /// `<entry name="..."/>` child per package.
    pub async fn list_packages(&self, project: &str) -> Result<Vec<String>, ObsError> {
        let url = format!("{}/source/{}", self.api_url, project);
        let body = self.cached_fetch(&url).await?;
        xml::entry_names(&body)
    }

    /// List all projects whose name starts with `project`.
    pub async fn list_subprojects(&self, project: &str) -> Result<Vec<String>, ObsError> {
        let match_expr = format!("starts_with(@name, \"{}\")", project);
        let url = format!(
            "{}/search/project/id?match={}",
            self.api_url,
            urlencoding::encode(&match_expr)
        );
        let body = self.cached_fetch(&url).await?;
        xml::project_names(&body)
    }

    /// Check whether any file in the package changed after `last_check`.
    ///
    /// Fetches `/source/{project}/{package}` and compares every entry's
    /// mtime against the watermark. Equal timestamps do not count as
    /// updated; a response without entries is "not updated".
    pub async fn package_was_updated(
        &self,
        last_check: Timestamp,
        project: &str,
        package: &str,
    ) -> Result<bool, ObsError> {
        let body = self.cached_fetch(&self.package_url(project, package)).await?;
        let timestamps = xml::entry_mtimes(&body)?;
        Ok(any_timestamp_is_newer(&timestamps, last_check))
    }

    /// Whether a package exists in a project.
    ///
    /// The source API has no dedicated existence endpoint; existence is
    /// inferred from the package fetch succeeding.
    pub async fn package_in_project(&self, package: &str, project: &str) -> bool {
        self.cached_fetch(&self.package_url(project, package))
            .await
            .is_ok()
    }

    fn package_url(&self, project: &str, package: &str) -> String {
        format!("{}/source/{}/{}", self.api_url, project, package)
    }

    async fn cached_fetch(&self, url: &str) -> FetchOutcome {
        fetch_with_cache(&self.cache, url, || self.fetch(url)).await
    }

    async fn fetch(&self, url: &str) -> FetchOutcome {
        debug!(url = %url, "querying build service");

        let transport_err = |reason: String| TransportError {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| transport_err(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| transport_err(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| transport_err(e.to_string()))
    }
}

fn any_timestamp_is_newer(timestamps: &[Timestamp], base: Timestamp) -> bool {
    timestamps.iter().any(|ts| *ts > base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_comparison_is_strict() {
        let timestamps = [1642780451, 1439233248, 1649762596];

        assert!(any_timestamp_is_newer(&timestamps, 1000000000));
        assert!(!any_timestamp_is_newer(&timestamps, 1700000000));
        // The newest entry itself is not "newer than" the watermark
        assert!(!any_timestamp_is_newer(&timestamps, 1649762596));
        assert!(any_timestamp_is_newer(&timestamps, 1649762595));
    }

    #[test]
    fn test_no_entries_is_not_updated() {
        assert!(!any_timestamp_is_newer(&[], 0));
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ObsClient::new(
            "https://api.opensuse.org/",
            ObsCredentials {
                username: "user".to_string(),
                password: "pass".to_string(),
            },
        )
        .unwrap();

        assert_eq!(client.api_url(), "https://api.opensuse.org");
        assert_eq!(
            client.package_url("openSUSE:Factory", "python-docker-pycreds"),
            "https://api.opensuse.org/source/openSUSE:Factory/python-docker-pycreds"
        );
    }

    #[test]
    fn test_transport_errors_convert_to_network() {
        let err: crate::BundlewatchError = ObsError::Transport(TransportError {
            url: "https://api.example/source/p".to_string(),
            reason: "connection refused".to_string(),
        })
        .into();
        assert!(matches!(err, crate::BundlewatchError::Network(_)));

        let err: crate::BundlewatchError = ObsError::Parse("bad xml".to_string()).into();
        assert!(matches!(err, crate::BundlewatchError::Parse(_)));
    }
}
