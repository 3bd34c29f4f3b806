//! Filesystem-backed storage: raw bytes and meta mappings under a root directory.
//!
//! Directory nesting mirrors `PackageCache`'s key convention (one
//! directory per path segment), keyed by the uniform `cdn/...` /
//! `registry/winget/...` key space rather than an npm-specific layout.

use crate::{Storage, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Raw files live under `<root>/raw/<key>`; meta mappings live under
/// `<root>/meta/<key>.json`. Keeping the two namespaces in separate
/// subtrees means a meta key and a raw key that happen to share a string
/// (a package prefix that is also a valid file path) never collide.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn raw_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        sanitized_join(&self.root.join("raw"), key)
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = sanitized_join(&self.root.join("meta"), key)?;
        path.set_extension("json");
        Ok(path)
    }

    fn raw_prefix_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        sanitized_join(&self.root.join("raw"), prefix)
    }

    fn meta_prefix_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        sanitized_join(&self.root.join("meta"), prefix)
    }
}

/// Join `key`'s path segments onto `base`, rejecting `..` components and
/// absolute segments so a crafted key can't escape the storage root.
fn sanitized_join(base: &Path, key: &str) -> Result<PathBuf, StorageError> {
    let mut path = base.to_path_buf();
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(StorageError::Other(format!("invalid storage key: {key}")));
        }
        path.push(segment);
    }
    Ok(path)
}

#[async_trait]
impl Storage for FilesystemStorage {
    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let path = self.raw_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn put_raw(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let path = self.raw_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // Write-then-rename keeps a concurrent reader from ever observing a
        // partially written file.
        let tmp = path.with_extension(format!(
            "tmp-{}",
            std::process::id()
        ));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, prefix: &str) -> Result<(), StorageError> {
        let raw_dir = self.raw_prefix_dir(prefix)?;
        match fs::remove_dir_all(&raw_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        let meta_dir = self.meta_prefix_dir(prefix)?;
        match fs::remove_dir_all(&meta_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        let meta_file = self.meta_path(prefix)?;
        match fs::remove_file(&meta_file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.meta_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Other(format!("corrupt meta at {key}: {e}")))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn set_meta(&self, key: &str, meta: serde_json::Value) -> Result<(), StorageError> {
        let mut merged = self.get_meta(key).await?.unwrap_or_else(|| serde_json::json!({}));
        match (&mut merged, &meta) {
            (serde_json::Value::Object(existing), serde_json::Value::Object(incoming)) => {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
            }
            _ => merged = meta,
        }

        let path = self.meta_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&merged)
            .map_err(|e| StorageError::Other(format!("failed to serialize meta: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        storage
            .put_raw("cdn/npm/uikit/1.0.0/a.js", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        let got = storage.get_raw("cdn/npm/uikit/1.0.0/a.js").await.unwrap();
        assert_eq!(got, Some(Bytes::from_static(b"hi")));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        assert_eq!(storage.get_raw("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_drops_nested_raw_files() {
        let dir = tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        storage
            .put_raw("cdn/npm/uikit/1.0.0/a.js", Bytes::from_static(b"a"))
            .await
            .unwrap();
        storage
            .set_meta("cdn/npm/uikit/1.0.0", serde_json::json!({"files": []}))
            .await
            .unwrap();

        storage.remove("cdn/npm/uikit/1.0.0").await.unwrap();

        assert_eq!(storage.get_raw("cdn/npm/uikit/1.0.0/a.js").await.unwrap(), None);
        assert_eq!(storage.get_meta("cdn/npm/uikit/1.0.0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_meta_merges_fields() {
        let dir = tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        storage
            .set_meta("cdn/npm/uikit/1.0.0", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        storage
            .set_meta("cdn/npm/uikit/1.0.0", serde_json::json!({"b": 2}))
            .await
            .unwrap();
        let meta = storage
            .get_meta("cdn/npm/uikit/1.0.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta, serde_json::json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn rejects_path_traversal_keys() {
        let dir = tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        let result = storage
            .put_raw("cdn/npm/../../../etc/passwd", Bytes::from_static(b"x"))
            .await;
        assert!(result.is_err());
    }
}
