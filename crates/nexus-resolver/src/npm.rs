//! npm registry client with in-memory packument caching and `ETag` revalidation.
//!
//! JSR resolves through the same code path against the npm-compatible
//! registry (`npm.jsr.io`, scoped package `@jsr/<scope>__<name>`), so this
//! client is also the JSR client — see [`Client::jsr`].

use crate::meta::UpstreamMeta;
use dashmap::DashMap;
use nexus_core::NexusError;
use reqwest::{Client as HttpClient, StatusCode};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How long a cached packument is trusted without revalidation.
const CACHE_FRESH_SECS: u64 = 300;

const ABBREVIATED_ACCEPT: &str = "application/vnd.npm.install-v1+json";

#[derive(Debug, Clone)]
struct CachedPackument {
    data: serde_json::Value,
    etag: Option<String>,
    cached_at: u64,
}

impl CachedPackument {
    fn is_fresh(&self) -> bool {
        now_secs().saturating_sub(self.cached_at) < CACHE_FRESH_SECS
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Client for an npm-registry-JSON-shaped metadata source.
///
/// Clones share the same in-memory packument cache.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: HttpClient,
    cache: Arc<DashMap<String, CachedPackument>>,
}

impl Client {
    /// Build a client against the canonical npm registry.
    #[must_use]
    pub fn npm() -> Self {
        Self::new("https://registry.npmjs.org")
    }

    /// Build a client against the npm-compatible JSR mirror.
    #[must_use]
    pub fn jsr() -> Self {
        Self::new("https://npm.jsr.io")
    }

    fn new(base_url: &str) -> Self {
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("static TLS/proxy config is always valid");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Fetch and normalize the packument for `name`.
    ///
    /// # Errors
    /// [`NexusError::PackageNotFound`] on a registry 404;
    /// [`NexusError::UpstreamUnavailable`] on any other transport failure.
    pub async fn fetch(&self, ecosystem: &str, name: &str) -> Result<UpstreamMeta, NexusError> {
        if let Some(cached) = self.cache.get(name) {
            if cached.is_fresh() {
                return Ok(to_meta(cached.data.clone()));
            }
        }

        let cached_etag = self.cache.get(name).and_then(|c| c.etag.clone());
        let encoded = encode_name(name);
        let url = format!("{}/{encoded}", self.base_url);

        let mut request = self.http.get(&url).header("Accept", ABBREVIATED_ACCEPT);
        if let Some(etag) = &cached_etag {
            request = request.header("If-None-Match", etag);
        }

        let response = request.send().await.map_err(|e| {
            NexusError::upstream_unavailable(format!("{ecosystem} metadata fetch for {name}: {e}"))
        })?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            if let Some(mut cached) = self.cache.get_mut(name) {
                cached.cached_at = now_secs();
                return Ok(to_meta(cached.data.clone()));
            }
        }

        if status == StatusCode::NOT_FOUND {
            return Err(NexusError::package_not_found(ecosystem, name));
        }
        if !status.is_success() {
            return Err(NexusError::upstream_unavailable(format!(
                "{ecosystem} registry returned {status} for {name}"
            )));
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let data: serde_json::Value = response.json().await.map_err(|e| {
            NexusError::upstream_unavailable(format!("invalid packument JSON for {name}: {e}"))
        })?;

        self.cache.insert(
            name.to_string(),
            CachedPackument {
                data: data.clone(),
                etag,
                cached_at: now_secs(),
            },
        );

        Ok(to_meta(data))
    }
}

fn encode_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replacen('/', "%2F", 1)
    } else {
        name.to_string()
    }
}

fn to_meta(packument: serde_json::Value) -> UpstreamMeta {
    let versions = packument
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();
    let latest = packument
        .get("dist-tags")
        .and_then(|t| t.get("latest"))
        .and_then(|v| v.as_str())
        .map(String::from);

    UpstreamMeta {
        versions,
        latest,
        raw: packument,
    }
}

/// The tarball URL for `version` inside an already-fetched packument.
#[must_use]
pub fn tarball_url<'a>(packument: &'a serde_json::Value, version: &str) -> Option<&'a str> {
    packument
        .get("versions")?
        .get(version)?
        .get("dist")?
        .get("tarball")?
        .as_str()
}

/// The `@jsr/<scope>__<name>` npm-compat package name for a JSR
/// `@scope/name` package, via JSR's npm-compat resolution.
#[must_use]
pub fn jsr_compat_name(scoped_name: &str) -> Option<String> {
    let rest = scoped_name.strip_prefix('@')?;
    let (scope, name) = rest.split_once('/')?;
    Some(format!("@jsr/{scope}__{name}"))
}
