//! Downloading and extracting a [`ResolvedPackage`]'s archive into the
//! flat `(path, bytes)` shape [`PackageCache`](crate::PackageCache) persists.

use bytes::Bytes;
use nexus_core::NexusError;
use nexus_resolver::{cdnjs, ArchiveSource, ResolvedPackage};
use reqwest::{Client as HttpClient, StatusCode};

/// Fetch and extract `resolved`'s full archive, regardless of which
/// ecosystem-specific shape it arrives in.
///
/// # Errors
/// [`NexusError::PackageNotFound`] on a 404 fetching the archive;
/// [`NexusError::UpstreamUnavailable`] on any other transport failure or on
/// a tarball/zip that fails to parse.
pub(crate) async fn fetch_all(
    http: &HttpClient,
    resolved: &ResolvedPackage,
) -> Result<Vec<(String, Bytes)>, NexusError> {
    match &resolved.archive {
        ArchiveSource::TarGz(url) => {
            let data = download(http, url, &resolved.key).await?;
            nexus_tarball::extract(&data)
                .map(to_pairs)
                .map_err(|e| NexusError::upstream_unavailable(format!("bad tarball: {e}")))
        }
        ArchiveSource::Zip(url) => {
            let data = download(http, url, &resolved.key).await?;
            nexus_tarball::extract_zip(&data)
                .map(to_pairs)
                .map_err(|e| NexusError::upstream_unavailable(format!("bad zip archive: {e}")))
        }
        ArchiveSource::CdnjsFiles { raw } => fetch_cdnjs_files(http, &resolved.key, raw).await,
    }
}

/// # Errors
/// [`NexusError::PackageNotFound`] on a 404 (spec §7: "upstream 404 at
/// metadata or tarball"); [`NexusError::UpstreamUnavailable`] on any other
/// non-success status or transport failure.
async fn download(
    http: &HttpClient,
    url: &str,
    key: &nexus_core::PackageKey,
) -> Result<Bytes, NexusError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| NexusError::upstream_unavailable(format!("fetching {url}: {e}")))?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(NexusError::package_not_found(key.ecosystem.to_string(), key.name.as_str()));
    }
    if !status.is_success() {
        return Err(NexusError::upstream_unavailable(format!("{url} returned {status}")));
    }
    response
        .bytes()
        .await
        .map_err(|e| NexusError::upstream_unavailable(format!("reading body of {url}: {e}")))
}

/// cdnjs has no archive at all: every file listed for this
/// version is fetched individually from the CDN.
async fn fetch_cdnjs_files(
    http: &HttpClient,
    key: &nexus_core::PackageKey,
    raw: &serde_json::Value,
) -> Result<Vec<(String, Bytes)>, NexusError> {
    let files = cdnjs::Client::files_for_version(raw, &key.version)
        .ok_or_else(|| NexusError::version_not_found(key.name.as_str(), key.version.as_str()))?;
    let base = cdnjs::Client::base_url(&key.name, &key.version);

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let url = format!("{base}/{file}");
        match download(http, &url, key).await {
            Ok(bytes) => entries.push((file, bytes)),
            Err(e) => {
                tracing::warn!(%url, error = %e, "failed to fetch cdnjs asset, skipping");
            }
        }
    }
    Ok(entries)
}

fn to_pairs(entries: Vec<nexus_tarball::ExtractedEntry>) -> Vec<(String, Bytes)> {
    entries.into_iter().map(|e| (e.path, e.bytes)).collect()
}
