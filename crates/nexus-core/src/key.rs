//! `PackageKey`: the `(ecosystem, name, version)` triple everything else keys off.

use crate::ecosystem::Ecosystem;
use regex::Regex;
use std::sync::OnceLock;

/// A concrete, resolved `(ecosystem, name, version)` triple.
///
/// `name` is ecosystem-normalized (scoped npm/JSR names keep their
/// `@scope/pkg` form, GitHub uses `owner/repo`, cdnjs a bare slug,
/// WordPress `plugins/<slug>` or `themes/<slug>`). `version` is always a
/// concrete string — never a range or alias — once constructed via
/// [`PackageKey::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
    pub ecosystem: Ecosystem,
    pub name: String,
    pub version: String,
}

fn complete_semver_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v?\d+\.\d+\.\d+").unwrap())
}

fn commit_sha_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{40}$").unwrap())
}

/// A version string matches `^\d+\.\d+\.\d+` after stripping an optional leading `v`.
#[must_use]
pub fn is_complete_semver(version: &str) -> bool {
    complete_semver_re().is_match(version)
}

/// A 40-character lowercase hex string (a Git commit SHA).
#[must_use]
pub fn is_commit_sha(version: &str) -> bool {
    commit_sha_re().is_match(version)
}

impl PackageKey {
    /// Build a key, computing immutability from `version`'s shape per ecosystem.
    ///
    /// For [`Ecosystem::Wp`], `version` carries the URL shape verbatim:
    /// `"trunk"` for a plugin's trunk checkout, `"tags/<v>"` for a plugin
    /// tag, or a bare version string for a theme (themes have no mutable
    /// form in the route table).
    #[must_use]
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            version: version.into(),
        }
    }

    /// Is this key immutable, per the rules in the data model (§3)?
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        match self.ecosystem {
            Ecosystem::Npm | Ecosystem::Jsr | Ecosystem::Cdnjs => {
                is_complete_semver(&self.version)
            }
            Ecosystem::Gh => is_commit_sha(&self.version) || is_complete_semver(&self.version),
            Ecosystem::Wp => self.version != "trunk",
            Ecosystem::Winget => true,
        }
    }

    /// The storage-key prefix for this package's files: `cdn/<eco>/<name>/<version>`.
    #[must_use]
    pub fn storage_prefix(&self) -> String {
        format!("cdn/{}/{}/{}", self.ecosystem, self.name, self.version)
    }
}
