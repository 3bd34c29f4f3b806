//! Shared response-building helpers: headers and the directory-listing body
//! (response-header rules, directory-listing fallback).

use crate::content_type::content_type_for;
use crate::error_response::AppError;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use nexus_core::NexusError;
use nexus_resolver::ResolvedPackage;
use serde_json::json;

/// `max-age=31536000, immutable` for an immutable key, `max-age=600` otherwise.
#[must_use]
pub fn cache_control_for(immutable: bool) -> &'static str {
    if immutable {
        "public, max-age=31536000, immutable"
    } else {
        "public, max-age=600"
    }
}

/// A single file's bytes, with `Content-Type` inferred from `path` and
/// `Cache-Control` derived from `immutable`.
pub fn file_response(path: &str, bytes: bytes::Bytes, immutable: bool) -> Response {
    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type_for(path))
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control_for(immutable)));
    response
}

/// Bundled ESM output: always `text/javascript`.
pub fn esm_response(body: String, immutable: bool) -> Response {
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/javascript; charset=utf-8"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control_for(immutable)));
    response
}

/// Directory listing at `prefix`: `404` if nothing
/// in the hydrated manifest starts with `prefix`.
///
/// # Errors
/// Propagates [`nexus_cache::PackageCache::list`]'s errors (forces
/// synchronous hydration on a cold package).
pub async fn list_directory(
    cache: &nexus_cache::PackageCache,
    resolved: &ResolvedPackage,
    prefix: &str,
) -> Result<Response, AppError> {
    let manifest = cache.list(resolved).await?;
    let files = manifest.files_under(prefix);
    if files.is_empty() {
        return Err(AppError(NexusError::file_not_found(
            resolved.key.name.as_str(),
            resolved.key.version.as_str(),
            prefix,
        )));
    }

    let body = json!({
        "name": resolved.key.name,
        "version": resolved.key.version,
        "path": prefix,
        "files": files.iter().map(|f| json!({
            "name": f.name,
            "size": f.size,
            "integrity": f.integrity,
        })).collect::<Vec<_>>(),
    });

    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control_for(resolved.key.is_immutable())));
    Ok(response)
}

/// `get_file` with the error-to-listing fallback: a miss on a
/// non-root path asks for a prefix-filtered listing instead of a bare 404.
pub async fn serve_file_or_fallback(
    cache: &nexus_cache::PackageCache,
    resolved: &ResolvedPackage,
    rel_path: &str,
) -> Result<Response, AppError> {
    match cache.get_file(resolved, rel_path).await {
        Ok((bytes, immutable)) => Ok(file_response(rel_path, bytes, immutable)),
        Err(NexusError::FileNotFound { .. }) => list_directory(cache, resolved, rel_path).await,
        Err(e) => Err(e.into()),
    }
}

#[must_use]
pub fn status_from_upstream(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}
