//! Streaming gzip/tar extraction into in-memory `(relative_path, bytes)` entries.
//!
//! Unlike an atomic extract-to-temp-dir-then-rename approach, this extractor
//! never touches a real filesystem path: the storage KV interface makes no
//! assumption of one. Path-traversal and absolute-path rejection are kept
//! even though entries only ever become byte blobs.

use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::Read;
use tar::Archive;
use thiserror::Error;

/// Failure extracting a gzipped tarball.
#[derive(Debug, Error)]
pub enum TarballError {
    #[error("failed to read tarball entries: {0}")]
    Read(#[source] std::io::Error),

    #[error("tarball entry has an unreadable path: {0}")]
    Path(#[source] std::io::Error),

    #[error("tarball entry contains an absolute path: {0}")]
    AbsolutePath(String),

    #[error("tarball entry contains path traversal: {0}")]
    PathTraversal(String),
}

/// A single regular file extracted from a tarball.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Path relative to the extracted package root, no leading separator.
    pub path: String,
    /// Decompressed bytes.
    pub bytes: Bytes,
}

/// Stream-parse gzipped tar `data` into an ordered sequence of regular-file
/// entries, stripping exactly one leading path segment (the upstream "root
/// directory" — `package/` for npm, `<repo>-<ref>/` for GitHub).
///
/// The root segment is chosen as the first path segment seen on the first
/// entry whose name contains a separator and does not begin with
/// `pax_global_header` (a synthetic PAX metadata entry some tar producers
/// emit before any real content). Entries that are not regular files
/// (directories, symlinks, devices) are skipped. An empty or single-segment
/// root directory yields no entries rather than an error — callers treat a
/// zero-entry extraction as a "package" synthesized from nothing, per
/// the empty-root boundary case.
pub fn extract(data: &[u8]) -> Result<Vec<ExtractedEntry>, TarballError> {
    let gz = GzDecoder::new(data);
    let mut archive = Archive::new(gz);

    let mut root: Option<String> = None;
    let mut entries = Vec::new();

    for raw_entry in archive.entries().map_err(TarballError::Read)? {
        let mut entry = raw_entry.map_err(TarballError::Read)?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path().map_err(TarballError::Path)?;
        let path_str = path.to_string_lossy().replace('\\', "/");

        if path_str.starts_with("pax_global_header") {
            continue;
        }

        if path.is_absolute() {
            return Err(TarballError::AbsolutePath(path_str));
        }
        if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(TarballError::PathTraversal(path_str));
        }

        let Some((root_seg, rest)) = path_str.split_once('/') else {
            // No separator at all: this entry sits at the synthesized root
            // itself. It never establishes a root segment to strip, and
            // there is nothing left to serve under it.
            continue;
        };

        if root.is_none() {
            root = Some(root_seg.to_string());
        }
        if root.as_deref() != Some(root_seg) {
            // Tarballs the resolver hands us always have one top-level
            // directory; a second one would indicate a malformed upstream
            // archive. Skip rather than fail the whole extraction.
            continue;
        }
        if rest.is_empty() {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(TarballError::Read)?;

        entries.push(ExtractedEntry {
            path: rest.to_string(),
            bytes: Bytes::from(bytes),
        });
    }

    Ok(entries)
}

/// Extract a zip archive (the format WordPress SVN exports plugin/theme
/// tags and `trunk` as) into the same `(relative_path, bytes)` shape the
/// gzip/tar extractor produces, stripping one leading root directory.
///
/// Shares the root-stripping and path-safety rules with [`extract`] so the
/// package cache in `nexus-cache` can treat both archive formats
/// identically once extracted.
pub fn extract_zip(data: &[u8]) -> Result<Vec<ExtractedEntry>, TarballError> {
    let reader = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| TarballError::Read(std::io::Error::other(e)))?;

    let mut root: Option<String> = None;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| TarballError::Read(std::io::Error::other(e)))?;

        if file.is_dir() {
            continue;
        }

        let path_str = file.name().replace('\\', "/");

        let Some((root_seg, rest)) = path_str.split_once('/') else {
            continue;
        };
        if root.is_none() {
            root = Some(root_seg.to_string());
        }
        if root.as_deref() != Some(root_seg) || rest.is_empty() {
            continue;
        }
        if rest.contains("..") {
            return Err(TarballError::PathTraversal(path_str));
        }

        let mut bytes = Vec::with_capacity(file.size() as usize);
        std::io::copy(&mut file, &mut bytes).map_err(TarballError::Read)?;

        entries.push(ExtractedEntry {
            path: rest.to_string(),
            bytes: Bytes::from(bytes),
        });
    }

    Ok(entries)
}
