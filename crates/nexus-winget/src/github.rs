//! Minimal client for the two GitHub REST endpoints the WinGet index needs:
//! recursive tree expansion and raw file content.

use nexus_core::NexusError;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";

/// One entry in a `git/trees` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    truncated: bool,
}

/// Talks to the GitHub REST API and raw-content CDN for one `owner/repo`
/// pair at a tracked branch. `api_base`/`raw_base` are overridable so tests
/// can point this at a `wiremock` server.
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    token: Option<String>,
    owner: String,
    repo: String,
    branch: String,
    api_base: String,
    raw_base: String,
}

impl Client {
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::with_token(owner, repo, branch, None)
    }

    #[must_use]
    pub fn with_token(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("static TLS/proxy config is always valid");
        Self {
            http,
            token,
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            api_base: API_BASE.to_string(),
            raw_base: RAW_BASE.to_string(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_bases(mut self, api_base: impl Into<String>, raw_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.raw_base = raw_base.into();
        self
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Resolve the tracked branch to its current commit SHA.
    ///
    /// # Errors
    /// [`NexusError::UpstreamUnavailable`] on any transport or non-2xx failure.
    pub async fn branch_sha(&self) -> Result<String, NexusError> {
        #[derive(Deserialize)]
        struct Ref {
            object: RefObject,
        }
        #[derive(Deserialize)]
        struct RefObject {
            sha: String,
        }

        let url = format!(
            "{}/repos/{}/{}/git/ref/heads/{}",
            self.api_base, self.owner, self.repo, self.branch
        );
        let reference: Ref = self.get_json(&url).await?;
        Ok(reference.object.sha)
    }

    /// List the tree at `sha`. `recursive` expands the whole subtree in one
    /// call (used for letter-bucket sub-trees); non-recursive lists one
    /// level (used for the manifests root and the letter-bucket probe).
    ///
    /// # Errors
    /// [`NexusError::UpstreamUnavailable`] on transport failure, a non-2xx
    /// response, or a truncated (too-large) tree response.
    pub async fn list_tree(&self, sha: &str, recursive: bool) -> Result<Vec<TreeEntry>, NexusError> {
        let url = if recursive {
            format!(
                "{}/repos/{}/{}/git/trees/{sha}?recursive=1",
                self.api_base, self.owner, self.repo
            )
        } else {
            format!("{}/repos/{}/{}/git/trees/{sha}", self.api_base, self.owner, self.repo)
        };

        let response: TreeResponse = self.get_json(&url).await?;
        if response.truncated {
            return Err(NexusError::upstream_unavailable(format!(
                "tree at {sha} was truncated by the GitHub API; repository is too large for one call"
            )));
        }
        Ok(response.tree)
    }

    /// Fetch raw file content at `path` on the tracked branch.
    ///
    /// # Errors
    /// [`NexusError::PackageNotFound`] on a 404; [`NexusError::UpstreamUnavailable`]
    /// on any other transport failure.
    pub async fn raw_content(&self, path: &str) -> Result<bytes::Bytes, NexusError> {
        let url = format!("{}/{}/{}/{}/{path}", self.raw_base, self.owner, self.repo, self.branch);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NexusError::upstream_unavailable(format!("fetching {url}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(NexusError::package_not_found("winget", path));
        }
        if !response.status().is_success() {
            return Err(NexusError::upstream_unavailable(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| NexusError::upstream_unavailable(format!("reading body of {url}: {e}")))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, NexusError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| NexusError::upstream_unavailable(format!("fetching {url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(NexusError::package_not_found("winget", url));
        }
        if !status.is_success() {
            return Err(NexusError::upstream_unavailable(format!(
                "{url} returned {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| NexusError::upstream_unavailable(format!("invalid JSON from {url}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn list_tree_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/microsoft/winget-pkgs/git/trees/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "abc123",
                "truncated": false,
                "tree": [
                    {"path": "manifests", "type": "tree", "sha": "deadbeef"},
                    {"path": "README.md", "type": "blob", "sha": "cafef00d"},
                ]
            })))
            .mount(&server)
            .await;

        let client = Client::new("microsoft", "winget-pkgs", "master")
            .with_bases(server.uri(), server.uri());
        let entries = client.list_tree("abc123", false).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "manifests");
        assert_eq!(entries[0].kind, "tree");
    }

    #[tokio::test]
    async fn truncated_tree_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/big"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "big",
                "truncated": true,
                "tree": []
            })))
            .mount(&server)
            .await;

        let client = Client::new("o", "r", "master").with_bases(server.uri(), server.uri());
        let err = client.list_tree("big", true).await.unwrap_err();
        assert!(matches!(err, NexusError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn raw_content_maps_404_to_package_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/o/r/master/manifests/m/Missing.yaml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = Client::new("o", "r", "master").with_bases(server.uri(), server.uri());
        let err = client
            .raw_content("manifests/m/Missing.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::PackageNotFound { .. }));
    }

    #[tokio::test]
    async fn raw_content_returns_bytes_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/o/r/master/manifests/m/Microsoft/Vs/1.0/Vs.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("PackageVersion: 1.0"))
            .mount(&server)
            .await;

        let client = Client::new("o", "r", "master").with_bases(server.uri(), server.uri());
        let bytes = client
            .raw_content("manifests/m/Microsoft/Vs/1.0/Vs.yaml")
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"PackageVersion: 1.0");
    }
}
