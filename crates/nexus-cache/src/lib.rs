//! The tarball-backed package cache: on-demand hydration of
//! a whole versioned artifact from a single-file request, with the rest of
//! the package warmed in a detached background task.

mod fetch;

use fetch::fetch_all;
use nexus_core::{FileEntry, NexusError, PackageKey, PackageManifest};
use nexus_resolver::ResolvedPackage;
use nexus_storage::Storage;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// `get_file` / `list` / `hydrate_async` over a configured [`Storage`] back-end.
#[derive(Clone)]
pub struct PackageCache {
    storage: Arc<dyn Storage>,
    http: reqwest::Client,
}

impl PackageCache {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("static TLS/proxy config is always valid");
        Self { storage, http }
    }

    /// The hot path: serve one file, hydrating the whole package from
    /// upstream on first miss and returning as soon as the requested entry
    /// is found, without waiting on any other file's persistence.
    ///
    /// # Errors
    /// [`NexusError::FileNotFound`] if the package hydrates but `path`
    /// isn't in it; upstream fetch failures propagate as
    /// [`NexusError::UpstreamUnavailable`] or [`NexusError::PackageNotFound`].
    pub async fn get_file(
        &self,
        resolved: &ResolvedPackage,
        path: &str,
    ) -> Result<(bytes::Bytes, bool), NexusError> {
        let raw_key = format!("{}/{path}", resolved.key.storage_prefix());

        if let Ok(Some(bytes)) = self.storage.get_raw(&raw_key).await {
            return Ok((bytes, resolved.key.is_immutable()));
        }

        let entries = fetch_all(&self.http, resolved).await?;
        let wanted = entries
            .iter()
            .find(|(entry_path, _)| entry_path == path)
            .map(|(_, bytes)| bytes.clone());

        self.spawn_warmup(resolved.clone(), entries.clone());

        let bytes = wanted.ok_or_else(|| {
            NexusError::file_not_found(resolved.key.name.as_str(), resolved.key.version.as_str(), path)
        })?;
        Ok((bytes, resolved.key.is_immutable()))
    }

    /// The meta object for this package: its full file listing with
    /// integrity, forcing synchronous hydration if it isn't cached yet.
    ///
    /// # Errors
    /// Propagates upstream fetch failures; never returns `FileNotFound`
    /// (an empty manifest is a valid, if unusual, hydrated package).
    pub async fn list(&self, resolved: &ResolvedPackage) -> Result<PackageManifest, NexusError> {
        if let Ok(Some(meta)) = self.storage.get_meta(&resolved.key.storage_prefix()).await {
            if let Ok(manifest) = serde_json::from_value::<PackageManifest>(meta) {
                return Ok(manifest);
            }
        }

        let entries = fetch_all(&self.http, resolved).await?;
        self.hydrate(resolved, entries).await
    }

    /// Fire-and-forget full-package warmup.
    pub fn hydrate_async(&self, resolved: ResolvedPackage) {
        let cache = self.clone();
        tokio::spawn(async move {
            match fetch_all(&cache.http, &resolved).await {
                Ok(entries) => {
                    let _ = cache.hydrate(&resolved, entries).await;
                }
                Err(e) => {
                    tracing::warn!(
                        ecosystem = %resolved.key.ecosystem,
                        name = %resolved.key.name,
                        version = %resolved.key.version,
                        error = %e,
                        "background warmup failed to fetch upstream archive"
                    );
                }
            }
        });
    }

    /// Persist every entry and the terminal manifest write, applying the
    /// mutable-key remove-before-warm-up policy. Used both
    /// for the detached post-response warmup and for the synchronous path
    /// `list` takes on a miss.
    async fn hydrate(
        &self,
        resolved: &ResolvedPackage,
        entries: Vec<(String, bytes::Bytes)>,
    ) -> Result<PackageManifest, NexusError> {
        let prefix = resolved.key.storage_prefix();

        if !resolved.key.is_immutable() {
            // A reader that races this remove either sees the previous full
            // manifest (storage hasn't caught up yet) or a miss that
            // triggers a fresh hydration of its own; never a partial one.
            if let Err(e) = self.storage.remove(&prefix).await {
                tracing::warn!(%prefix, error = %e, "failed to clear mutable package prefix before warmup");
            }
        }

        let puts = entries.iter().map(|(path, data)| {
            let prefix = prefix.clone();
            let path = path.clone();
            let data = data.clone();
            let storage = Arc::clone(&self.storage);
            async move {
                let raw_key = format!("{prefix}/{path}");
                if matches!(storage.get_raw(&raw_key).await, Ok(Some(_))) {
                    return;
                }
                if let Err(e) = storage.put_raw(&raw_key, data).await {
                    tracing::warn!(%raw_key, error = %e, "failed to persist warmed file, skipping");
                }
            }
        });
        futures::future::join_all(puts).await;

        let files: Vec<FileEntry> = entries
            .iter()
            .map(|(path, data)| {
                FileEntry::new(path.clone(), data.len() as u64)
                    .with_integrity(nexus_integrity::sri_sha256(data))
            })
            .collect();
        let manifest = PackageManifest::new(files, now_secs());

        let manifest_json = serde_json::to_value(&manifest).map_err(NexusError::InvalidManifest)?;
        if let Err(e) = self.storage.set_meta(&prefix, manifest_json).await {
            tracing::warn!(%prefix, error = %e, "failed to persist package manifest");
        }

        Ok(manifest)
    }

    fn spawn_warmup(&self, resolved: ResolvedPackage, entries: Vec<(String, bytes::Bytes)>) {
        let cache = self.clone();
        tokio::spawn(async move {
            let _ = cache.hydrate(&resolved, entries).await;
        });
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::Ecosystem;
    use nexus_resolver::ArchiveSource;
    use nexus_storage::MemoryStorage;
    use std::io::Write;

    fn sample_tgz() -> Vec<u8> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use tar::{Builder, Header};

        let mut tar_bytes = Vec::new();
        {
            let mut builder = Builder::new(&mut tar_bytes);
            let mut add = |path: &str, data: &[u8]| {
                let mut header = Header::new_gnu();
                header.set_path(path).unwrap();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append(&header, data).unwrap();
            };
            add("package/package.json", br#"{"name":"uikit"}"#);
            add("package/dist/js/uikit.js", b"console.log(1)");
            builder.finish().unwrap();
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    async fn serve_tgz() -> (wiremock::MockServer, Vec<u8>) {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let body = sample_tgz();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;
        (server, body)
    }

    fn resolved(ecosystem: Ecosystem, name: &str, version: &str, url: String) -> ResolvedPackage {
        ResolvedPackage {
            key: PackageKey::new(ecosystem, name, version),
            archive: ArchiveSource::TarGz(url),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn get_file_hydrates_and_returns_requested_entry() {
        let (server, _) = serve_tgz().await;
        let cache = PackageCache::new(Arc::new(MemoryStorage::new()));
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0", server.uri());

        let (bytes, immutable) = cache
            .get_file(&resolved, "dist/js/uikit.js")
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"console.log(1)");
        assert!(immutable);
    }

    #[tokio::test]
    async fn get_file_missing_path_is_file_not_found() {
        let (server, _) = serve_tgz().await;
        let cache = PackageCache::new(Arc::new(MemoryStorage::new()));
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0", server.uri());

        let err = cache.get_file(&resolved, "nope.js").await.unwrap_err();
        assert!(matches!(err, NexusError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn archive_404_is_package_not_found_not_upstream_unavailable() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let cache = PackageCache::new(Arc::new(MemoryStorage::new()));
        let resolved = resolved(Ecosystem::Gh, "vuejs/core", "deadbeef", server.uri());

        let err = cache.get_file(&resolved, "package.json").await.unwrap_err();
        assert!(matches!(err, NexusError::PackageNotFound { .. }));
    }

    #[tokio::test]
    async fn archive_500_is_upstream_unavailable() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let cache = PackageCache::new(Arc::new(MemoryStorage::new()));
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0", server.uri());

        let err = cache.get_file(&resolved, "package.json").await.unwrap_err();
        assert!(matches!(err, NexusError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn second_get_file_is_served_from_storage() {
        let (server, _) = serve_tgz().await;
        let storage = Arc::new(MemoryStorage::new());
        let cache = PackageCache::new(storage.clone());
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0", server.uri());

        cache.get_file(&resolved, "package.json").await.unwrap();
        // Give the detached warmup a moment to persist everything.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let raw_key = format!("{}/dist/js/uikit.js", resolved.key.storage_prefix());
        assert!(storage.get_raw(&raw_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_force_hydrates_and_returns_manifest_with_integrity() {
        let (server, _) = serve_tgz().await;
        let cache = PackageCache::new(Arc::new(MemoryStorage::new()));
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0", server.uri());

        let manifest = cache.list(&resolved).await.unwrap();
        assert_eq!(manifest.files.len(), 2);
        assert!(manifest.files.iter().all(|f| f.integrity.is_some()));
    }

    #[tokio::test]
    async fn mutable_key_clears_prefix_before_rewriting_manifest() {
        let (server, _) = serve_tgz().await;
        let storage = Arc::new(MemoryStorage::new());
        let cache = PackageCache::new(storage.clone());
        let resolved = resolved(Ecosystem::Npm, "react", "latest", server.uri());
        assert!(!resolved.key.is_immutable());

        let prefix = resolved.key.storage_prefix();
        storage
            .set_meta(&prefix, serde_json::json!({"files": [], "written_at": 0}))
            .await
            .unwrap();

        let manifest = cache.list(&resolved).await.unwrap();
        assert_eq!(manifest.files.len(), 2);
    }
}
