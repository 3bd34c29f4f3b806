//! cdnjs library API client.
//!
//! cdnjs has no per-version tarball; the library API instead enumerates
//! every file at every version directly. `nexus-cache` fetches those files
//! individually rather than routing cdnjs through the tar extractor — see
//! `UpstreamSource::Cdnjs` in `nexus-cache`.

use crate::meta::UpstreamMeta;
use dashmap::DashMap;
use nexus_core::NexusError;
use reqwest::{Client as HttpClient, StatusCode};
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs";

#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    cache: Arc<DashMap<String, serde_json::Value>>,
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

    /// Fetch the library descriptor (`version`, `versions`, `filename`) for `name`.
    ///
    /// # Errors
    /// [`NexusError::PackageNotFound`] on a 404; [`NexusError::UpstreamUnavailable`]
    /// on any other transport failure.
    pub async fn fetch(&self, name: &str) -> Result<UpstreamMeta, NexusError> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(to_meta(cached.clone()));
        }

        let url = format!(
            "https://api.cdnjs.com/libraries/{name}?fields=version,versions,filename,assets"
        );
        let response = self.http.get(&url).send().await.map_err(|e| {
            NexusError::upstream_unavailable(format!("cdnjs fetch for {name}: {e}"))
        })?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(NexusError::package_not_found("cdnjs", name));
        }
        if !status.is_success() {
            return Err(NexusError::upstream_unavailable(format!(
                "cdnjs returned {status} for {name}"
            )));
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| {
            NexusError::upstream_unavailable(format!("invalid cdnjs JSON for {name}: {e}"))
        })?;

        // An empty object is cdnjs's shape for "library not found" on some
        // deployments instead of a 404.
        if raw.get("version").is_none() {
            return Err(NexusError::package_not_found("cdnjs", name));
        }

        self.cache.insert(name.to_string(), raw.clone());
        Ok(to_meta(raw))
    }

    /// Files listed for `version` in `assets`, or `None` if that version
    /// isn't present in the already-fetched descriptor.
    #[must_use]
    pub fn files_for_version(raw: &serde_json::Value, version: &str) -> Option<Vec<String>> {
        raw.get("assets")?.as_array()?.iter().find_map(|entry| {
            if entry.get("version").and_then(|v| v.as_str()) != Some(version) {
                return None;
            }
            entry.get("files").and_then(|f| f.as_array()).map(|arr| {
                arr.iter()
                    .filter_map(|f| f.as_str())
                    .map(String::from)
                    .collect()
            })
        })
    }

    /// The base URL a given library's version's files are served from.
    #[must_use]
    pub fn base_url(name: &str, version: &str) -> String {
        format!("{BASE_URL}/{name}/{version}")
    }
}

fn to_meta(raw: serde_json::Value) -> UpstreamMeta {
    let versions = raw
        .get("versions")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(String::from).collect())
        .unwrap_or_default();
    let latest = raw.get("version").and_then(|v| v.as_str()).map(String::from);
    UpstreamMeta { versions, latest, raw }
}
