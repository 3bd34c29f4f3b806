//! The Nexus error taxonomy (§7): one enum, one stable `code()` per variant.
//!
//! `nexus-core` carries no HTTP types, so the status-code mapping itself
//! lives in `nexus-server`'s `IntoResponse` impl; this enum only commits to
//! the variants and their machine-readable codes.

use thiserror::Error;

/// Stable, machine-readable error codes — these are part of the JSON error
/// body's `code` field and should not be renamed once shipped.
pub mod codes {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const PACKAGE_NOT_FOUND: &str = "PACKAGE_NOT_FOUND";
    pub const VERSION_NOT_FOUND: &str = "VERSION_NOT_FOUND";
    pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";
    pub const UPSTREAM_UNAVAILABLE: &str = "UPSTREAM_UNAVAILABLE";
    pub const STORAGE_UNAVAILABLE: &str = "STORAGE_UNAVAILABLE";
    pub const INVALID_MANIFEST: &str = "INVALID_MANIFEST";
}

/// Core error type for Nexus operations.
#[derive(Error, Debug)]
pub enum NexusError {
    /// A request that is malformed independent of any upstream state:
    /// an unknown ecosystem segment, an unparseable version range, a
    /// match-type the `manifestSearch` grammar doesn't recognize.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The package name itself doesn't exist upstream.
    #[error("package not found: {ecosystem}/{name}")]
    PackageNotFound { ecosystem: String, name: String },

    /// The package exists, but no published version satisfies the request.
    #[error("no version of {name} satisfies {range}")]
    VersionNotFound { name: String, range: String },

    /// The package/version resolved, but the requested file isn't in it.
    #[error("file not found: {path} in {name}@{version}")]
    FileNotFound {
        name: String,
        version: String,
        path: String,
    },

    /// An upstream (registry, tarball host, Git provider) could not be
    /// reached or returned a server error. Distinct from `FileNotFound`:
    /// this is "we don't know", not "it doesn't exist".
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The storage backend itself failed (disk I/O, in a future
    /// backend a connection drop) independent of the above.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] std::io::Error),

    /// A manifest or upstream payload failed to parse as the shape we expect.
    #[error("invalid manifest: {0}")]
    InvalidManifest(#[source] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl NexusError {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    #[must_use]
    pub fn package_not_found(ecosystem: impl Into<String>, name: impl Into<String>) -> Self {
        Self::PackageNotFound {
            ecosystem: ecosystem.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn version_not_found(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self::VersionNotFound {
            name: name.into(),
            range: range.into(),
        }
    }

    #[must_use]
    pub fn file_not_found(
        name: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::FileNotFound {
            name: name.into(),
            version: version.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn upstream_unavailable(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    /// The stable machine-readable code for this variant, used in both the
    /// JSON error body and for status-code dispatch in `nexus-server`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => codes::BAD_REQUEST,
            Self::PackageNotFound { .. } => codes::PACKAGE_NOT_FOUND,
            Self::VersionNotFound { .. } => codes::VERSION_NOT_FOUND,
            Self::FileNotFound { .. } => codes::FILE_NOT_FOUND,
            Self::UpstreamUnavailable(_) => codes::UPSTREAM_UNAVAILABLE,
            Self::StorageUnavailable(_) => codes::STORAGE_UNAVAILABLE,
            Self::InvalidManifest(_) => codes::INVALID_MANIFEST,
            Self::Other(_) => codes::BAD_REQUEST,
        }
    }
}

impl From<std::io::Error> for NexusError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageUnavailable(e)
    }
}

impl From<serde_json::Error> for NexusError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidManifest(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_screaming_snake_case() {
        let all = [
            NexusError::bad_request("x").code(),
            NexusError::package_not_found("npm", "left-pad").code(),
            NexusError::version_not_found("left-pad", "^99").code(),
            NexusError::file_not_found("left-pad", "1.0.0", "dist/x.js").code(),
            NexusError::upstream_unavailable("timeout").code(),
        ];
        for code in all {
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn io_error_maps_to_storage_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: NexusError = io_err.into();
        assert_eq!(err.code(), codes::STORAGE_UNAVAILABLE);
    }

    #[test]
    fn bad_json_maps_to_invalid_manifest() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: NexusError = json_err.into();
        assert_eq!(err.code(), codes::INVALID_MANIFEST);
    }

    #[test]
    fn display_includes_identifying_detail() {
        let err = NexusError::package_not_found("npm", "left-pad");
        assert!(err.to_string().contains("npm/left-pad"));
    }
}
