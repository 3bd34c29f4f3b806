//! `/cdn/<ecosystem>/...` file and directory-listing routes.

use axum::extract::{OriginalUri, State};
use axum::http::Uri;
use axum::response::Response;
use nexus_core::Ecosystem;

use crate::cdn_path;
use crate::entry_file;
use crate::error_response::AppError;
use crate::responses::{esm_response, list_directory, serve_file_or_fallback};
use crate::AppState;

pub async fn npm(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Result<Response, AppError> {
    serve_npm_or_jsr(state, uri, Ecosystem::Npm, "/cdn/npm/").await
}

pub async fn jsr(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Result<Response, AppError> {
    serve_npm_or_jsr(state, uri, Ecosystem::Jsr, "/cdn/jsr/").await
}

async fn serve_npm_or_jsr(
    state: AppState,
    uri: Uri,
    ecosystem: Ecosystem,
    prefix: &str,
) -> Result<Response, AppError> {
    let raw = uri.path().strip_prefix(prefix).unwrap_or("");
    let trailing_slash = raw.len() > 1 && raw.ends_with('/');
    let (name, spec, rel_path) = cdn_path::parse_npm_like(raw.trim_end_matches('/'));
    let resolved = state.resolver.resolve(ecosystem, &name, spec.as_deref()).await?;
    let immutable = resolved.key.is_immutable();

    if trailing_slash {
        return list_directory(&state.cache, &resolved, rel_path.trim_end_matches('/')).await;
    }

    if rel_path.is_empty() {
        let entry = match ecosystem {
            Ecosystem::Jsr => entry_file::jsr_entry(&resolved),
            _ => entry_file::npm_entry(&resolved),
        };
        return serve_file_or_fallback(&state.cache, &resolved, &entry).await;
    }

    if ecosystem == Ecosystem::Npm && rel_path == "+esm" {
        let entry = entry_file::npm_entry(&resolved);
        let bundle = state.bundler.bundle_esm(&resolved, &entry).await?;
        return Ok(esm_response(bundle, immutable));
    }

    serve_file_or_fallback(&state.cache, &resolved, &rel_path).await
}

pub async fn gh(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Result<Response, AppError> {
    let raw = uri.path().strip_prefix("/cdn/gh/").unwrap_or("");
    let trailing_slash = raw.len() > 1 && raw.ends_with('/');
    let (name, spec, rel_path) = cdn_path::parse_gh_path(raw.trim_end_matches('/'))?;
    let resolved = state.resolver.resolve(Ecosystem::Gh, &name, spec.as_deref()).await?;

    if trailing_slash {
        return list_directory(&state.cache, &resolved, rel_path.trim_end_matches('/')).await;
    }

    if rel_path.is_empty() {
        let entry = entry_file::gh_entry(&state.cache, &resolved).await?;
        return serve_file_or_fallback(&state.cache, &resolved, &entry).await;
    }

    serve_file_or_fallback(&state.cache, &resolved, &rel_path).await
}

pub async fn cdnjs(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Result<Response, AppError> {
    let raw = uri.path().strip_prefix("/cdn/cdnjs/").unwrap_or("");
    let trailing_slash = raw.len() > 1 && raw.ends_with('/');
    let (name, spec, rel_path) = cdn_path::parse_cdnjs_path(raw.trim_end_matches('/'));
    let resolved = state.resolver.resolve(Ecosystem::Cdnjs, &name, spec.as_deref()).await?;

    if trailing_slash {
        return list_directory(&state.cache, &resolved, rel_path.trim_end_matches('/')).await;
    }

    if rel_path.is_empty() {
        let entry = entry_file::cdnjs_entry(&resolved).ok_or_else(|| {
            nexus_core::NexusError::file_not_found(
                resolved.key.name.as_str(),
                resolved.key.version.as_str(),
                "<default filename>",
            )
        })?;
        return serve_file_or_fallback(&state.cache, &resolved, &entry).await;
    }

    serve_file_or_fallback(&state.cache, &resolved, &rel_path).await
}

pub async fn wp(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Result<Response, AppError> {
    let raw = uri.path().strip_prefix("/cdn/wp/").unwrap_or("");
    let trailing_slash = raw.len() > 1 && raw.ends_with('/');
    let (name, version, rel_path) = cdn_path::parse_wp_path(raw.trim_end_matches('/'))?;
    let resolved = state.resolver.resolve(Ecosystem::Wp, &name, Some(version.as_str())).await?;

    if trailing_slash || rel_path.is_empty() {
        return list_directory(&state.cache, &resolved, rel_path.trim_end_matches('/')).await;
    }

    serve_file_or_fallback(&state.cache, &resolved, &rel_path).await
}
