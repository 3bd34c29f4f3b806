//! Generic registry passthrough: a table of
//! `registry-name -> upstream-base-URL`, proxying the request/response body
//! unchanged.

use bytes::Bytes;
use nexus_core::{NexusConfig, NexusError};
use reqwest::Client as HttpClient;
use std::time::Duration;

/// A proxied upstream response, unmodified except for the headers the
/// handler layer chooses to forward.
#[derive(Debug, Clone)]
pub struct MirroredResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Proxies `/mirror/<registry>/<path>` requests against the base-URL table
/// in [`NexusConfig`].
#[derive(Debug, Clone)]
pub struct Mirror {
    http: HttpClient,
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirror {
    #[must_use]
    pub fn new() -> Self {
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("static TLS/proxy config is always valid");
        Self { http }
    }

    /// Validate `registry` against `config`'s table and proxy `path`
    /// unchanged against its upstream base.
    ///
    /// Path concatenation does not normalize duplicate slashes (a
    /// noted open question: behavior matches the upstream source even though
    /// it may surprise operators joining an already-slashed base and path).
    ///
    /// # Errors
    /// [`NexusError::PackageNotFound`] if `registry` isn't in the table;
    /// [`NexusError::UpstreamUnavailable`] on any transport failure.
    pub async fn fetch(
        &self,
        config: &NexusConfig,
        registry: &str,
        path: &str,
    ) -> Result<MirroredResponse, NexusError> {
        let base = config
            .mirror_base(registry)
            .ok_or_else(|| NexusError::package_not_found("mirror", registry))?;

        let url = format!("{base}/{path}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NexusError::upstream_unavailable(format!("mirroring {url}: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .map_err(|e| NexusError::upstream_unavailable(format!("reading body of {url}: {e}")))?;

        Ok(MirroredResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn unknown_registry_is_package_not_found() {
        let mirror = Mirror::new();
        let config = NexusConfig::default();
        let err = mirror.fetch(&config, "nope", "react").await.unwrap_err();
        assert!(matches!(err, NexusError::PackageNotFound { .. }));
    }

    #[tokio::test]
    async fn known_registry_proxies_body_and_status_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/react"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"name\":\"react\"}")
                    .insert_header("content-type", "application/json"),
            )
            .mount(&server)
            .await;

        let mirror = Mirror::new();
        let mut config = NexusConfig::default();
        config.mirrors.insert("npm".to_string(), server.uri());

        let response = mirror.fetch(&config, "npm", "react").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_ref(), b"{\"name\":\"react\"}");
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn path_concatenation_does_not_collapse_duplicate_slashes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("//react"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let mirror = Mirror::new();
        let mut config = NexusConfig::default();
        config.mirrors.insert("npm".to_string(), format!("{}/", server.uri()));

        let response = mirror.fetch(&config, "npm", "/react").await.unwrap();
        assert_eq!(response.status, 200);
    }
}
