//! Upstream version resolution: `(ecosystem, name, version-spec)` ->
//! concrete, cacheable [`nexus_core::PackageKey`].
//!
//! One algorithm (§4.2) specialized per ecosystem only at the metadata
//! source and the archive-fetch shape; see [`Resolver::resolve`].

pub mod cdnjs;
pub mod github;
pub mod meta;
pub mod npm;
pub mod range;
pub mod wordpress;

pub use meta::UpstreamMeta;

use nexus_core::{key::is_commit_sha, Ecosystem, NexusError, PackageKey};

/// Where the package cache should pull this key's bytes from.
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    /// A gzipped tarball at this URL (npm, JSR, GitHub).
    TarGz(String),
    /// A zip archive at this URL (WordPress plugins/themes).
    Zip(String),
    /// No single archive; individual files are listed in `raw` and fetched
    /// one at a time from cdnjs's CDN (see `nexus_resolver::cdnjs`).
    CdnjsFiles { raw: serde_json::Value },
}

/// The result of resolving one request: a concrete key, where to fetch its
/// bytes, and (where the metadata fetch already has it) the raw upstream
/// payload request handlers use for entry-file selection.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub key: PackageKey,
    pub archive: ArchiveSource,
    pub metadata: Option<serde_json::Value>,
}

/// Resolves version specifiers to concrete keys for every ecosystem.
#[derive(Debug, Clone)]
pub struct Resolver {
    npm: npm::Client,
    jsr: npm::Client,
    github: github::Client,
    cdnjs: cdnjs::Client,
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            npm: npm::Client::npm(),
            jsr: npm::Client::jsr(),
            github: github::Client::new(),
            cdnjs: cdnjs::Client::new(),
        }
    }

    /// Resolve `(ecosystem, name, spec)` to a [`ResolvedPackage`].
    ///
    /// `spec` is `None` when the caller omitted a version entirely (bare
    /// `name`, no `@version`); ecosystem-specific defaulting applies.
    ///
    /// # Errors
    /// [`NexusError::PackageNotFound`] if the name itself doesn't exist
    /// upstream; [`NexusError::VersionNotFound`] if metadata was fetched but
    /// no version satisfies `spec`; [`NexusError::UpstreamUnavailable`] on
    /// transport failure; [`NexusError::BadRequest`] for malformed names
    /// (e.g. an unscoped JSR package).
    pub async fn resolve(
        &self,
        ecosystem: Ecosystem,
        name: &str,
        spec: Option<&str>,
    ) -> Result<ResolvedPackage, NexusError> {
        match ecosystem {
            Ecosystem::Npm => self.resolve_npm(name, spec).await,
            Ecosystem::Jsr => self.resolve_jsr(name, spec).await,
            Ecosystem::Gh => self.resolve_gh(name, spec).await,
            Ecosystem::Cdnjs => self.resolve_cdnjs(name, spec).await,
            Ecosystem::Wp => Ok(resolve_wp(name, spec)),
            Ecosystem::Winget => Err(NexusError::bad_request(
                "winget packages are resolved through the WinGet index, not the version resolver",
            )),
        }
    }

    async fn resolve_npm(
        &self,
        name: &str,
        spec: Option<&str>,
    ) -> Result<ResolvedPackage, NexusError> {
        let meta = self.npm.fetch("npm", name).await?;
        let version = resolve_version(&meta.versions, spec, meta.latest.as_deref())
            .ok_or_else(|| NexusError::version_not_found(name, spec.unwrap_or("latest")))?;

        let tarball = npm::tarball_url(&meta.raw, &version)
            .ok_or_else(|| {
                NexusError::upstream_unavailable(format!(
                    "npm packument for {name} has no tarball dist for {version}"
                ))
            })?
            .to_string();

        Ok(ResolvedPackage {
            key: PackageKey::new(Ecosystem::Npm, name, version),
            archive: ArchiveSource::TarGz(tarball),
            metadata: Some(meta.raw),
        })
    }

    async fn resolve_jsr(
        &self,
        name: &str,
        spec: Option<&str>,
    ) -> Result<ResolvedPackage, NexusError> {
        let compat_name = npm::jsr_compat_name(name).ok_or_else(|| {
            NexusError::bad_request(format!("JSR package name must be @scope/name: {name}"))
        })?;
        let meta = self.jsr.fetch("jsr", &compat_name).await?;
        let version = resolve_version(&meta.versions, spec, meta.latest.as_deref())
            .ok_or_else(|| NexusError::version_not_found(name, spec.unwrap_or("latest")))?;

        let tarball = npm::tarball_url(&meta.raw, &version)
            .ok_or_else(|| {
                NexusError::upstream_unavailable(format!(
                    "JSR packument for {name} has no tarball dist for {version}"
                ))
            })?
            .to_string();

        Ok(ResolvedPackage {
            key: PackageKey::new(Ecosystem::Jsr, name, version),
            archive: ArchiveSource::TarGz(tarball),
            metadata: Some(meta.raw),
        })
    }

    async fn resolve_gh(
        &self,
        name: &str,
        spec: Option<&str>,
    ) -> Result<ResolvedPackage, NexusError> {
        let (owner, repo) = name.split_once('/').ok_or_else(|| {
            NexusError::bad_request(format!("GitHub package name must be owner/repo: {name}"))
        })?;

        if let Some(sha) = spec.filter(|s| is_commit_sha(s)) {
            return Ok(ResolvedPackage {
                key: PackageKey::new(Ecosystem::Gh, name, sha),
                archive: ArchiveSource::TarGz(github::tarball_url(owner, repo, sha)),
                metadata: None,
            });
        }

        let meta = self.github.fetch(owner, repo).await?;
        let version = match spec {
            None => meta.latest.clone().unwrap_or_else(|| "main".to_string()),
            Some(s) => {
                resolve_version(&meta.versions, Some(s), meta.latest.as_deref())
                    // No tag matches and nothing to fall back to: treat the
                    // spec as a literal branch/ref name (mutable), per
                    // branches are mutable, unlike tags.
                    .unwrap_or_else(|| s.to_string())
            }
        };

        Ok(ResolvedPackage {
            key: PackageKey::new(Ecosystem::Gh, name, &version),
            archive: ArchiveSource::TarGz(github::tarball_url(owner, repo, &version)),
            metadata: None,
        })
    }

    async fn resolve_cdnjs(
        &self,
        name: &str,
        spec: Option<&str>,
    ) -> Result<ResolvedPackage, NexusError> {
        let meta = self.cdnjs.fetch(name).await?;
        let version = resolve_version(&meta.versions, spec, meta.latest.as_deref())
            .ok_or_else(|| NexusError::version_not_found(name, spec.unwrap_or("latest")))?;

        Ok(ResolvedPackage {
            key: PackageKey::new(Ecosystem::Cdnjs, name, version),
            archive: ArchiveSource::CdnjsFiles {
                raw: meta.raw.clone(),
            },
            metadata: Some(meta.raw),
        })
    }
}

/// WordPress has no metadata fetch: the request's own path
/// shape already carries the version and its mutability.
fn resolve_wp(name: &str, spec: Option<&str>) -> ResolvedPackage {
    let version = spec.unwrap_or("trunk");
    let (kind, slug) = name.split_once('/').unwrap_or(("plugins", name));

    let url = if kind == "themes" {
        wordpress::theme_archive_url(slug, version)
    } else {
        wordpress::plugin_archive_url(slug, version)
    };

    ResolvedPackage {
        key: PackageKey::new(Ecosystem::Wp, name, version),
        archive: ArchiveSource::Zip(url),
        metadata: None,
    }
}

/// The shared resolution algorithm: exact
/// match, range match, `latest` tag, then newest-by-semver.
fn resolve_version(versions: &[String], spec: Option<&str>, latest: Option<&str>) -> Option<String> {
    if let Some(spec) = spec {
        if versions.iter().any(|v| v == spec) {
            return Some(spec.to_string());
        }
        if let Some(found) = range::max_satisfying(versions, spec) {
            return Some(found.to_string());
        }
    }
    if let Some(latest) = latest {
        return Some(latest.to_string());
    }
    range::sort_descending(versions)
        .first()
        .map(|v| (*v).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_wins_over_range() {
        let v = versions(&["1.0.0", "1.0.0-beta"]);
        assert_eq!(
            resolve_version(&v, Some("1.0.0"), None),
            Some("1.0.0".to_string())
        );
    }

    #[test]
    fn range_match_when_no_exact() {
        let v = versions(&["18.2.0", "18.3.1"]);
        assert_eq!(
            resolve_version(&v, Some("18"), None),
            Some("18.3.1".to_string())
        );
    }

    #[test]
    fn falls_back_to_latest_tag() {
        let v = versions(&["1.0.0", "2.0.0"]);
        assert_eq!(
            resolve_version(&v, Some("nonsense"), Some("1.0.0")),
            Some("1.0.0".to_string())
        );
    }

    #[test]
    fn falls_back_to_sorted_descending_without_latest_tag() {
        let v = versions(&["1.0.0", "2.0.0", "1.5.0"]);
        assert_eq!(
            resolve_version(&v, Some("nonsense"), None),
            Some("2.0.0".to_string())
        );
    }

    #[test]
    fn no_spec_prefers_latest_tag() {
        let v = versions(&["1.0.0", "2.0.0"]);
        assert_eq!(
            resolve_version(&v, None, Some("1.0.0")),
            Some("1.0.0".to_string())
        );
    }

    #[test]
    fn wp_trunk_is_mutable_key() {
        let resolved = resolve_wp("plugins/akismet", Some("trunk"));
        assert!(!resolved.key.is_immutable());
    }

    #[test]
    fn wp_tag_is_immutable_key() {
        let resolved = resolve_wp("plugins/akismet", Some("tags/5.3"));
        assert!(resolved.key.is_immutable());
    }

    #[test]
    fn wp_theme_has_no_trunk_route() {
        let resolved = resolve_wp("themes/twentytwentyfour", Some("1.2"));
        assert!(resolved.key.is_immutable());
    }

    #[test]
    fn resolver_is_cheaply_cloneable() {
        let resolver = Resolver::new();
        let _clone = resolver.clone();
    }
}
