//! The layered WinGet package index: a read-through cache
//! over the `microsoft/winget-pkgs` Git-tree API, refreshed with a
//! stale-while-revalidate discipline.

pub mod github;
pub mod manifest;
pub mod search;

pub use manifest::{Manifest, ManifestKind};
pub use search::MatchType;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use nexus_core::NexusError;
use nexus_storage::Storage;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_OWNER: &str = "microsoft";
const DEFAULT_REPO: &str = "winget-pkgs";
const DEFAULT_BRANCH: &str = "master";
const MANIFESTS_DIR: &str = "manifests";
const REFRESH_TTL_SECS: u64 = 600;
const PACKAGE_PAGE_SIZE: usize = 100;
const VERSIONS_PER_PACKAGE_IN_SEARCH: usize = 10;

fn letter_dir_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]$").unwrap())
}

/// `PackageIdentifier -> sorted (newest-first) versions`.
pub type PackageVersions = BTreeMap<String, Vec<String>>;

/// The WinGet index cache, wrapping a [`Storage`] back-end and a GitHub
/// Git-tree client for one tracked repository/branch.
#[derive(Clone)]
pub struct WinGetIndex {
    storage: Arc<dyn Storage>,
    github: github::Client,
}

impl WinGetIndex {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_github(storage, github::Client::new(DEFAULT_OWNER, DEFAULT_REPO, DEFAULT_BRANCH))
    }

    #[must_use]
    pub fn with_token(storage: Arc<dyn Storage>, github_token: Option<String>) -> Self {
        Self::with_github(
            storage,
            github::Client::with_token(DEFAULT_OWNER, DEFAULT_REPO, DEFAULT_BRANCH, github_token),
        )
    }

    #[must_use]
    pub fn with_github(storage: Arc<dyn Storage>, github: github::Client) -> Self {
        Self { storage, github }
    }

    /// The storage key space is uniform across back-ends:
    /// `registry/winget/<repo>/<suffix>`, one prefix per tracked repository
    /// so two configured repos never collide.
    fn repo_key(&self, suffix: &str) -> String {
        format!("registry/winget/{}/{suffix}", self.github.repo())
    }

    /// The full `PackageIdentifier -> versions` mapping, applying
    /// stale-while-revalidate: fresh cache is returned as-is; stale cache is
    /// returned immediately while a rebuild is scheduled in the background;
    /// no cache forces a synchronous rebuild.
    ///
    /// # Errors
    /// [`NexusError::UpstreamUnavailable`] if no cached index exists yet and
    /// the synchronous rebuild's root/letter probe fails.
    pub async fn index(&self) -> Result<PackageVersions, NexusError> {
        match self.cached_index().await {
            Some((packages, age)) if age < REFRESH_TTL_SECS => Ok(packages),
            Some((packages, _stale)) => {
                self.spawn_rebuild();
                Ok(packages)
            }
            None => self.rebuild().await,
        }
    }

    /// Force a synchronous rebuild and return the freshly built index.
    ///
    /// # Errors
    /// [`NexusError::UpstreamUnavailable`] if the root tree or letter-bucket
    /// probe fails; individual letter failures are isolated
    /// and simply drop that letter's packages from the result.
    pub async fn rebuild(&self) -> Result<PackageVersions, NexusError> {
        let manifests_sha = self.root_tree_sha().await?;
        let letters = self.letter_shas(&manifests_sha).await?;

        let fetches = letters.iter().map(|(letter, sha)| {
            let letter = letter.clone();
            let sha = sha.clone();
            async move {
                match self.letter_paths(&letter, &sha).await {
                    Ok(paths) => (letter, paths),
                    Err(e) => {
                        tracing::warn!(letter, error = %e, "winget letter fetch failed, dropping from index");
                        (letter, Vec::new())
                    }
                }
            }
        });
        let per_letter = futures::future::join_all(fetches).await;

        let mut packages: PackageVersions = BTreeMap::new();
        for (letter, paths) in per_letter {
            accumulate_packages(&letter, &paths, &mut packages);
        }
        for versions in packages.values_mut() {
            sort_versions_descending(versions);
        }

        let meta = serde_json::json!({
            "packages": packages,
            "mtime": now_secs(),
        });
        if let Err(e) = self.storage.set_meta(&self.repo_key("index"), meta).await {
            tracing::warn!(error = %e, "failed to persist rebuilt winget index");
        }

        Ok(packages)
    }

    /// One package's versions, newest first, or `None` if unknown.
    ///
    /// # Errors
    /// Propagates [`Self::index`]'s errors.
    pub async fn versions(&self, identifier: &str) -> Result<Option<Vec<String>>, NexusError> {
        Ok(self.index().await?.get(identifier).cloned())
    }

    /// One page of package identifiers (sorted), 100 per page, continued via
    /// an opaque base64-encoded numeric offset token.
    ///
    /// # Errors
    /// Propagates [`Self::index`]'s errors; [`NexusError::bad_request`] for
    /// a malformed continuation token.
    pub async fn page(
        &self,
        continuation: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>), NexusError> {
        let offset = match continuation {
            None => 0,
            Some(token) => decode_offset(token)?,
        };
        let ids: Vec<String> = self.index().await?.into_keys().collect();
        let page: Vec<String> = ids
            .iter()
            .skip(offset)
            .take(PACKAGE_PAGE_SIZE)
            .cloned()
            .collect();
        let next = if offset + page.len() < ids.len() {
            Some(encode_offset(offset + page.len()))
        } else {
            None
        };
        Ok((page, next))
    }

    /// `manifestSearch`: match every `PackageIdentifier` against `keyword`
    /// under `match_type`, capping each result's version list at the 10
    /// newest first.
    ///
    /// # Errors
    /// Propagates [`Self::index`]'s errors.
    pub async fn search(
        &self,
        keyword: &str,
        match_type: MatchType,
        max_results: Option<usize>,
    ) -> Result<Vec<(String, Vec<String>)>, NexusError> {
        let packages = self.index().await?;
        let mut results: Vec<(String, Vec<String>)> = packages
            .into_iter()
            .filter(|(id, _)| search::matches(id, keyword, match_type))
            .map(|(id, mut versions)| {
                versions.truncate(VERSIONS_PER_PACKAGE_IN_SEARCH);
                (id, versions)
            })
            .collect();
        if let Some(max) = max_results {
            results.truncate(max);
        }
        Ok(results)
    }

    /// Raw manifest file content at `path` (e.g.
    /// `manifests/m/Microsoft/VisualStudioCode/1.85.0/Microsoft.VisualStudioCode.yaml`),
    /// cached indefinitely since a written manifest path never changes bytes.
    ///
    /// # Errors
    /// [`NexusError::PackageNotFound`] if no such file exists upstream;
    /// [`NexusError::UpstreamUnavailable`] on transport failure.
    pub async fn manifest_file(&self, path: &str) -> Result<bytes::Bytes, NexusError> {
        let key = self.repo_key(&format!("files/{path}"));
        if let Ok(Some(bytes)) = self.storage.get_raw(&key).await {
            return Ok(bytes);
        }
        let bytes = self.github.raw_content(path).await?;
        if let Err(e) = self.storage.put_raw(&key, bytes.clone()).await {
            tracing::warn!(%key, error = %e, "failed to persist winget manifest file");
        }
        Ok(bytes)
    }

    /// Every manifest file path (version, locale, and installer manifests)
    /// for one package version, as full repo-relative paths
    /// (`manifests/<letter>/<publisher>/<name>/<version>/...yaml`).
    ///
    /// The per-letter path lists (layer 3) are already cached by
    /// [`Self::rebuild`]/[`Self::index`]; this reuses them rather than
    /// tracking a separate per-version file index.
    ///
    /// # Errors
    /// [`NexusError::BadRequest`] if `identifier` isn't `Publisher.Name`;
    /// [`NexusError::PackageNotFound`] if the identifier's letter bucket
    /// doesn't exist; [`NexusError::VersionNotFound`] if no manifest file
    /// matches `version`.
    pub async fn manifest_paths(
        &self,
        identifier: &str,
        version: &str,
    ) -> Result<Vec<String>, NexusError> {
        let (publisher, name) = identifier.split_once('.').ok_or_else(|| {
            NexusError::bad_request(format!("winget identifier must be Publisher.Name: {identifier}"))
        })?;
        let letter = identifier
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .ok_or_else(|| NexusError::bad_request("empty winget identifier"))?
            .to_string();

        let manifests_sha = self.root_tree_sha().await?;
        let letters = self.letter_shas(&manifests_sha).await?;
        let sha = letters
            .iter()
            .find(|(l, _)| l == &letter)
            .map(|(_, sha)| sha.clone())
            .ok_or_else(|| NexusError::package_not_found("winget", identifier))?;

        let paths = self.letter_paths(&letter, &sha).await?;
        let prefix = format!("{publisher}/{name}/{version}/");
        let matched: Vec<String> = paths
            .iter()
            .filter(|p| p.starts_with(&prefix))
            .map(|p| format!("{MANIFESTS_DIR}/{letter}/{p}"))
            .collect();

        if matched.is_empty() {
            return Err(NexusError::version_not_found(identifier, version));
        }
        Ok(matched)
    }

    async fn cached_index(&self) -> Option<(PackageVersions, u64)> {
        let meta = self.storage.get_meta(&self.repo_key("index")).await.ok()??;
        let packages: PackageVersions =
            serde_json::from_value(meta.get("packages")?.clone()).ok()?;
        let mtime = meta.get("mtime")?.as_u64()?;
        Some((packages, now_secs().saturating_sub(mtime)))
    }

    fn spawn_rebuild(&self) {
        let index = self.clone();
        tokio::spawn(async move {
            if let Err(e) = index.rebuild().await {
                tracing::warn!(error = %e, "background winget rebuild failed");
            }
        });
    }

    /// Layer 1: locate `manifests`'s tree SHA under the repository root,
    /// reusing the cached value within the TTL.
    async fn root_tree_sha(&self) -> Result<String, NexusError> {
        let key = self.repo_key("manifests-sha");
        if let Ok(Some(meta)) = self.storage.get_meta(&key).await {
            if let (Some(sha), Some(mtime)) = (
                meta.get("tree_sha").and_then(|v| v.as_str()),
                meta.get("mtime").and_then(serde_json::Value::as_u64),
            ) {
                if now_secs().saturating_sub(mtime) < REFRESH_TTL_SECS {
                    return Ok(sha.to_string());
                }
            }
        }

        let branch_sha = self.github.branch_sha().await?;
        let root_entries = self.github.list_tree(&branch_sha, false).await?;
        let manifests = root_entries
            .iter()
            .find(|e| e.path == MANIFESTS_DIR && e.kind == "tree")
            .ok_or_else(|| {
                NexusError::upstream_unavailable(
                    "winget repository root has no 'manifests' tree entry",
                )
            })?;

        let meta = serde_json::json!({ "tree_sha": manifests.sha, "mtime": now_secs() });
        if let Err(e) = self.storage.set_meta(&key, meta).await {
            tracing::warn!(error = %e, "failed to persist winget root tree probe");
        }
        Ok(manifests.sha.clone())
    }

    /// Layer 2: one-level listing of `manifests`, filtered to single-char
    /// `[a-z0-9]` tree entries. Fails hard if the result is empty.
    async fn letter_shas(&self, manifests_sha: &str) -> Result<Vec<(String, String)>, NexusError> {
        let key = self.repo_key("manifests-letters");
        if let Ok(Some(meta)) = self.storage.get_meta(&key).await {
            if let (Some(letters), Some(mtime), Some(cached_root)) = (
                meta.get("letters").and_then(serde_json::Value::as_object),
                meta.get("mtime").and_then(serde_json::Value::as_u64),
                meta.get("root_sha").and_then(|v| v.as_str()),
            ) {
                if cached_root == manifests_sha && now_secs().saturating_sub(mtime) < REFRESH_TTL_SECS {
                    return Ok(letters
                        .iter()
                        .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                        .collect());
                }
            }
        }

        let entries = self.github.list_tree(manifests_sha, false).await?;
        let letters: Vec<(String, String)> = entries
            .into_iter()
            .filter(|e| e.kind == "tree" && letter_dir_re().is_match(&e.path))
            .map(|e| (e.path, e.sha))
            .collect();

        if letters.is_empty() {
            return Err(NexusError::upstream_unavailable(
                "winget 'manifests' tree has no letter-bucket sub-trees",
            ));
        }

        let letters_map: serde_json::Map<String, serde_json::Value> = letters
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        let meta = serde_json::json!({
            "letters": letters_map,
            "root_sha": manifests_sha,
            "mtime": now_secs(),
        });
        if let Err(e) = self.storage.set_meta(&key, meta).await {
            tracing::warn!(error = %e, "failed to persist winget letter-bucket probe");
        }

        Ok(letters)
    }

    /// Layer 3: recursive tree expansion at one letter's SHA, flattened to a
    /// relative path list and cached by letter+SHA.
    async fn letter_paths(&self, letter: &str, sha: &str) -> Result<Vec<String>, NexusError> {
        let key = self.repo_key(&format!("manifests-{letter}"));
        if let Ok(Some(meta)) = self.storage.get_meta(&key).await {
            if let (Some(paths), Some(cached_sha), Some(mtime)) = (
                meta.get("paths").and_then(serde_json::Value::as_array),
                meta.get("sha").and_then(|v| v.as_str()),
                meta.get("mtime").and_then(serde_json::Value::as_u64),
            ) {
                if cached_sha == sha && now_secs().saturating_sub(mtime) < REFRESH_TTL_SECS {
                    return Ok(paths
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect());
                }
            }
        }

        let entries = self.github.list_tree(sha, true).await?;
        let paths: Vec<String> = entries
            .into_iter()
            .filter(|e| e.kind == "blob")
            .map(|e| e.path)
            .collect();

        let meta = serde_json::json!({ "paths": paths, "sha": sha, "mtime": now_secs() });
        if let Err(e) = self.storage.set_meta(&key, meta).await {
            tracing::warn!(%letter, error = %e, "failed to persist winget letter path list");
        }

        Ok(paths)
    }
}

/// Layer 4: fold one letter's flattened path list into `packages`, parsing
/// `<publisher>/<name>/<version>/<file>.yaml` (the letter prefix is already
/// stripped since these paths are relative to the letter's own sub-tree).
fn accumulate_packages(_letter: &str, paths: &[String], packages: &mut PackageVersions) {
    for path in paths {
        if !path.ends_with(".yaml") {
            continue;
        }
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 4 {
            continue;
        }
        let version = segments[segments.len() - 2];
        let name = segments[segments.len() - 3];
        let publisher = segments[segments.len() - 4];
        let identifier = format!("{publisher}.{name}");

        let versions = packages.entry(identifier).or_default();
        if !versions.iter().any(|v| v == version) {
            versions.push(version.to_string());
        }
    }
}

fn sort_versions_descending(versions: &mut [String]) {
    versions.sort_by(|a, b| match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        _ => b.cmp(a),
    });
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn encode_offset(offset: usize) -> String {
    BASE64.encode(offset.to_string())
}

fn decode_offset(token: &str) -> Result<usize, NexusError> {
    let decoded = BASE64
        .decode(token)
        .map_err(|_| NexusError::bad_request("invalid pagination continuation token"))?;
    let text = String::from_utf8(decoded)
        .map_err(|_| NexusError::bad_request("invalid pagination continuation token"))?;
    text.parse()
        .map_err(|_| NexusError::bad_request("invalid pagination continuation token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_storage::MemoryStorage;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vscode_version_yaml() -> &'static str {
        "PackageIdentifier: Microsoft.VisualStudioCode\nPackageVersion: 1.85.0\n"
    }

    async fn mock_repo() -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/microsoft/winget-pkgs/git/ref/heads/master"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": {"sha": "root-sha"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/microsoft/winget-pkgs/git/trees/root-sha"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "root-sha",
                "truncated": false,
                "tree": [
                    {"path": "manifests", "type": "tree", "sha": "manifests-sha"},
                    {"path": "README.md", "type": "blob", "sha": "readme-sha"},
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/microsoft/winget-pkgs/git/trees/manifests-sha"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "manifests-sha",
                "truncated": false,
                "tree": [
                    {"path": "m", "type": "tree", "sha": "letter-m-sha"},
                    {"path": "z", "type": "tree", "sha": "letter-z-sha"},
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/microsoft/winget-pkgs/git/trees/letter-m-sha"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "letter-m-sha",
                "truncated": false,
                "tree": [
                    {
                        "path": "Microsoft/VisualStudioCode/1.85.0/Microsoft.VisualStudioCode.yaml",
                        "type": "blob",
                        "sha": "a"
                    },
                    {
                        "path": "Microsoft/VisualStudioCode/1.84.0/Microsoft.VisualStudioCode.yaml",
                        "type": "blob",
                        "sha": "b"
                    },
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/microsoft/winget-pkgs/git/trees/letter-z-sha"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(
                "/microsoft/winget-pkgs/master/manifests/m/Microsoft/VisualStudioCode/1.85.0/Microsoft.VisualStudioCode.yaml",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(vscode_version_yaml()))
            .mount(&server)
            .await;

        server
    }

    fn index_for(server: &MockServer) -> WinGetIndex {
        let github = github::Client::new("microsoft", "winget-pkgs", "master")
            .with_bases(server.uri(), server.uri());
        WinGetIndex::with_github(Arc::new(MemoryStorage::new()), github)
    }

    #[test]
    fn storage_keys_are_scoped_under_registry_winget_repo() {
        let storage = Arc::new(MemoryStorage::new());
        let a = WinGetIndex::with_github(storage.clone(), github::Client::new("microsoft", "winget-pkgs", "master"));
        let b = WinGetIndex::with_github(storage, github::Client::new("someone", "winget-pkgs-fork", "main"));

        assert_eq!(a.repo_key("index"), "registry/winget/winget-pkgs/index");
        assert_eq!(b.repo_key("index"), "registry/winget/winget-pkgs-fork/index");
        assert_ne!(a.repo_key("manifests-sha"), b.repo_key("manifests-sha"));
    }

    #[tokio::test]
    async fn rebuild_indexes_package_versions_newest_first() {
        let server = mock_repo().await;
        let index = index_for(&server);

        let packages = index.rebuild().await.unwrap();
        let versions = packages.get("Microsoft.VisualStudioCode").unwrap();
        assert_eq!(versions, &vec!["1.85.0".to_string(), "1.84.0".to_string()]);
    }

    #[tokio::test]
    async fn a_single_letter_failure_does_not_fail_the_whole_rebuild() {
        let server = mock_repo().await;
        let index = index_for(&server);

        let packages = index.rebuild().await.unwrap();
        assert!(packages.contains_key("Microsoft.VisualStudioCode"));
    }

    #[tokio::test]
    async fn index_request_with_zero_cached_letters_rebuilds_synchronously() {
        let server = mock_repo().await;
        let index = index_for(&server);

        let packages = index.index().await.unwrap();
        assert!(packages.contains_key("Microsoft.VisualStudioCode"));
    }

    #[tokio::test]
    async fn search_fuzzy_matches_subsequence() {
        let server = mock_repo().await;
        let index = index_for(&server);
        index.rebuild().await.unwrap();

        let results = index
            .search("vscode", MatchType::Fuzzy, None)
            .await
            .unwrap();
        assert!(results.iter().any(|(id, _)| id == "Microsoft.VisualStudioCode"));
    }

    #[tokio::test]
    async fn manifest_file_is_cached_after_first_fetch() {
        let server = mock_repo().await;
        let index = index_for(&server);

        let path = "manifests/m/Microsoft/VisualStudioCode/1.85.0/Microsoft.VisualStudioCode.yaml";
        let first = index.manifest_file(path).await.unwrap();
        assert_eq!(first.as_ref(), vscode_version_yaml().as_bytes());

        // Drop the mock server's backing state is irrelevant; the second
        // call must be served from storage without hitting the network.
        let second = index.manifest_file(path).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn pagination_offsets_round_trip_through_base64() {
        let server = mock_repo().await;
        let index = index_for(&server);
        index.rebuild().await.unwrap();

        let (page, next) = index.page(None).await.unwrap();
        assert!(page.contains(&"Microsoft.VisualStudioCode".to_string()));
        assert!(next.is_none());
    }

    #[test]
    fn bad_continuation_token_is_bad_request() {
        let err = decode_offset("not-base64!!").unwrap_err();
        assert!(matches!(err, NexusError::BadRequest(_)));
    }

    #[tokio::test]
    async fn manifest_paths_finds_the_version_manifest_file() {
        let server = mock_repo().await;
        let index = index_for(&server);

        let paths = index
            .manifest_paths("Microsoft.VisualStudioCode", "1.85.0")
            .await
            .unwrap();
        assert_eq!(
            paths,
            vec![
                "manifests/m/Microsoft/VisualStudioCode/1.85.0/Microsoft.VisualStudioCode.yaml"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn manifest_paths_unknown_version_is_version_not_found() {
        let server = mock_repo().await;
        let index = index_for(&server);

        let err = index
            .manifest_paths("Microsoft.VisualStudioCode", "0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::VersionNotFound { .. }));
    }
}
