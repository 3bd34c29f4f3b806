//! `FileEntry` and `PackageManifest`: the cache's "this package is hydrated" record.

use serde::{Deserialize, Serialize};

/// A single file inside an extracted, hydrated package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the extracted package root, no leading separator.
    pub name: String,
    /// Decompressed byte length.
    pub size: u64,
    /// Subresource-Integrity token (`sha256-<base64>`), present only once
    /// this entry's bytes have been hashed and persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl FileEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            integrity: None,
        }
    }

    #[must_use]
    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }
}

/// The meta object associated with a `PackageKey`: the file list plus a
/// timestamp. Its presence under a package's storage prefix is the cache's
/// "fully hydrated" marker — see the storage invariants in §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub files: Vec<FileEntry>,
    /// Unix seconds when this manifest was written.
    pub written_at: u64,
}

impl PackageManifest {
    #[must_use]
    pub fn new(files: Vec<FileEntry>, written_at: u64) -> Self {
        Self { files, written_at }
    }

    /// Find a file by its relative path.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == path)
    }

    /// Files whose name starts with `prefix` (a directory-listing filter).
    ///
    /// `prefix` is normalized to end with `/` unless empty, so `"dist"`
    /// does not spuriously match `"dist-tools/x"`.
    #[must_use]
    pub fn files_under(&self, prefix: &str) -> Vec<&FileEntry> {
        if prefix.is_empty() {
            return self.files.iter().collect();
        }
        let prefix = if prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };
        self.files
            .iter()
            .filter(|f| f.name.starts_with(&prefix))
            .collect()
    }
}
