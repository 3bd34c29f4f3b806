//! GitHub version metadata via jsDelivr's GitHub API mirror, and the
//! codeload tarball URL GitHub itself serves for any ref.

use crate::meta::UpstreamMeta;
use dashmap::DashMap;
use nexus_core::NexusError;
use reqwest::{Client as HttpClient, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Client over `data.jsdelivr.com`'s GitHub package endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    cache: Arc<DashMap<String, UpstreamMetaCache>>,
}

#[derive(Debug, Clone)]
struct UpstreamMetaCache {
    versions: Vec<String>,
    raw: serde_json::Value,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    #[must_use]
    pub fn new() -> Self {
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("static TLS/proxy config is always valid");
        Self {
            http,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Fetch the tag list for `owner/repo`.
    ///
    /// # Errors
    /// [`NexusError::PackageNotFound`] if jsDelivr has no record of the
    /// repo; [`NexusError::UpstreamUnavailable`] on any other failure.
    pub async fn fetch(&self, owner: &str, repo: &str) -> Result<UpstreamMeta, NexusError> {
        let key = format!("{owner}/{repo}");
        if let Some(cached) = self.cache.get(&key) {
            return Ok(UpstreamMeta {
                versions: cached.versions.clone(),
                latest: cached.versions.first().cloned(),
                raw: cached.raw.clone(),
            });
        }

        let url = format!("https://data.jsdelivr.com/v1/packages/gh/{owner}/{repo}");
        let response = self.http.get(&url).send().await.map_err(|e| {
            NexusError::upstream_unavailable(format!("jsDelivr fetch for {key}: {e}"))
        })?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(NexusError::package_not_found("gh", &key));
        }
        if !status.is_success() {
            return Err(NexusError::upstream_unavailable(format!(
                "jsDelivr returned {status} for {key}"
            )));
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| {
            NexusError::upstream_unavailable(format!("invalid jsDelivr JSON for {key}: {e}"))
        })?;

        let versions: Vec<String> = raw
            .get("versions")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|entry| entry.get("version").and_then(|v| v.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        self.cache.insert(
            key,
            UpstreamMetaCache {
                versions: versions.clone(),
                raw: raw.clone(),
            },
        );

        Ok(UpstreamMeta {
            latest: versions.first().cloned(),
            versions,
            raw,
        })
    }
}

/// GitHub's codeload tarball URL for any ref (tag, branch, or commit SHA).
#[must_use]
pub fn tarball_url(owner: &str, repo: &str, version: &str) -> String {
    format!("https://codeload.github.com/{owner}/{repo}/tar.gz/{version}")
}
