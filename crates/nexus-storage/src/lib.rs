//! The Storage KV dependency interface (spec §4.1) and its two concrete backends.
//!
//! The core never reads two keys as a transaction; `Storage` is deliberately
//! a four-operation interface so any object store, embedded KV, or
//! filesystem can back it.

mod filesystem;
mod memory;

pub use filesystem::FilesystemStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport-level failure talking to a storage back-end.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage transport error: {0}")]
    Other(String),
}

impl From<StorageError> for nexus_core::NexusError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Io(io) => nexus_core::NexusError::StorageUnavailable(io),
            StorageError::Other(msg) => nexus_core::NexusError::StorageUnavailable(
                std::io::Error::other(msg),
            ),
        }
    }
}

/// The narrow contract the core requires of whatever back-end is configured.
///
/// Callers treat a `StorageError` as a cache miss on reads and as a
/// best-effort dropped write on warmup writes. The trait
/// itself does not encode that policy; callers apply it.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the raw bytes at `key`, or `None` if absent.
    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Write `bytes` at `key`. Atomic w.r.t. other `get_raw` calls on the
    /// same key; concurrent writers racing on the same key may interleave,
    /// but a reader never observes a torn value.
    async fn put_raw(&self, key: &str, bytes: Bytes) -> Result<(), StorageError>;

    /// Remove `prefix` itself and every key nested below it.
    async fn remove(&self, prefix: &str) -> Result<(), StorageError>;

    /// Fetch the meta mapping at `key`, or `None` if absent.
    async fn get_meta(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Write `meta` at `key`. Merge semantics: existing top-level fields not
    /// present in `meta` are preserved.
    async fn set_meta(&self, key: &str, meta: serde_json::Value) -> Result<(), StorageError>;
}

/// `true` if `key` is `prefix` itself or nested under it (`prefix` followed
/// by `/`). Shared by both backends so the remove-by-prefix boundary rule is
/// identical everywhere.
pub(crate) fn under_prefix(key: &str, prefix: &str) -> bool {
    key == prefix || key.starts_with(&format!("{prefix}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_boundary_does_not_over_match() {
        assert!(under_prefix("cdn/npm/uikit/1.0.0", "cdn/npm/uikit/1.0.0"));
        assert!(under_prefix(
            "cdn/npm/uikit/1.0.0/dist/x.js",
            "cdn/npm/uikit/1.0.0"
        ));
        assert!(!under_prefix("cdn/npm/uikit2/1.0.0", "cdn/npm/uikit"));
    }
}
