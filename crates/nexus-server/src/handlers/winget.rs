//! `/registry/winget/...` routes: package listing, version and
//! sub-manifest detail, and `manifestSearch`.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json, Response};
use nexus_core::NexusError;
use nexus_winget::{Manifest, ManifestKind, MatchType};
use serde::Deserialize;
use serde_json::json;

use crate::error_response::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct PackagesQuery {
    #[serde(rename = "continuationToken")]
    pub continuation_token: Option<String>,
}

pub async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<PackagesQuery>,
) -> Result<Response, AppError> {
    let (ids, next) = state.winget.page(query.continuation_token.as_deref()).await?;
    Ok(Json(json!({
        "PackageIdentifiers": ids,
        "ContinuationToken": next,
    }))
    .into_response())
}

pub async fn package_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let versions = state
        .winget
        .versions(&id)
        .await?
        .ok_or_else(|| NexusError::package_not_found("winget", &id))?;
    Ok(Json(json!({ "PackageIdentifier": id, "Versions": versions })).into_response())
}

pub async fn version_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let versions = state
        .winget
        .versions(&id)
        .await?
        .ok_or_else(|| NexusError::package_not_found("winget", &id))?;
    Ok(Json(json!({ "PackageIdentifier": id, "Versions": versions })).into_response())
}

/// Fetch and parse every manifest file (version, locale, installer) for one
/// `(identifier, version)` pair.
async fn version_manifests(state: &AppState, id: &str, version: &str) -> Result<Vec<Manifest>, AppError> {
    let paths = state.winget.manifest_paths(id, version).await?;
    let mut manifests = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = state.winget.manifest_file(&path).await?;
        let filename = path.rsplit('/').next().unwrap_or(path.as_str());
        manifests.push(Manifest::parse(filename, &bytes)?);
    }
    Ok(manifests)
}

pub async fn version_detail(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let manifests = version_manifests(&state, &id, &version).await?;
    let found = manifests
        .iter()
        .find(|m| m.kind == ManifestKind::Version)
        .ok_or_else(|| NexusError::version_not_found(&id, &version))?;
    Ok(Json(found.raw().clone()).into_response())
}

pub async fn locales(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let manifests = version_manifests(&state, &id, &version).await?;
    let locales: Vec<_> = manifests
        .iter()
        .filter(|m| m.kind == ManifestKind::Locale)
        .map(|m| m.raw().clone())
        .collect();
    Ok(Json(json!({ "PackageIdentifier": id, "PackageVersion": version, "Locales": locales })).into_response())
}

pub async fn locale_detail(
    State(state): State<AppState>,
    Path((id, version, locale)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let manifests = version_manifests(&state, &id, &version).await?;
    let found = manifests
        .iter()
        .filter(|m| m.kind == ManifestKind::Locale)
        .find(|m| m.raw().get("PackageLocale").and_then(|v| v.as_str()) == Some(locale.as_str()))
        .ok_or_else(|| NexusError::file_not_found(&id, &version, &locale))?;
    Ok(Json(found.raw().clone()).into_response())
}

pub async fn installers(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let manifests = version_manifests(&state, &id, &version).await?;
    let all: Vec<_> = manifests
        .iter()
        .filter(|m| m.kind == ManifestKind::Installer)
        .flat_map(Manifest::installers)
        .cloned()
        .collect();
    Ok(Json(json!({ "PackageIdentifier": id, "PackageVersion": version, "Installers": all })).into_response())
}

pub async fn installer_detail(
    State(state): State<AppState>,
    Path((id, version, installer_id)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let manifests = version_manifests(&state, &id, &version).await?;
    let found = manifests
        .iter()
        .filter(|m| m.kind == ManifestKind::Installer)
        .flat_map(Manifest::installers)
        .find(|v| v.get("InstallerIdentifier").and_then(|x| x.as_str()) == Some(installer_id.as_str()))
        .ok_or_else(|| NexusError::file_not_found(&id, &version, &installer_id))?;
    Ok(Json(found.clone()).into_response())
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
    #[serde(rename = "matchType")]
    pub match_type: Option<MatchType>,
    #[serde(rename = "maximumResults")]
    pub maximum_results: Option<usize>,
}

pub async fn search_get(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    run_search(
        &state,
        query.query.unwrap_or_default(),
        query.match_type.unwrap_or_default(),
        query.maximum_results,
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct SearchKeyword {
    #[serde(rename = "KeyWord")]
    pub keyword: String,
    #[serde(rename = "MatchType")]
    pub match_type: Option<MatchType>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(rename = "Query")]
    pub query: SearchKeyword,
    #[serde(rename = "MaximumResults")]
    pub maximum_results: Option<usize>,
}

pub async fn search_post(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Response, AppError> {
    run_search(
        &state,
        body.query.keyword,
        body.query.match_type.unwrap_or_default(),
        body.maximum_results,
    )
    .await
}

async fn run_search(
    state: &AppState,
    keyword: String,
    match_type: MatchType,
    maximum_results: Option<usize>,
) -> Result<Response, AppError> {
    let results = state.winget.search(&keyword, match_type, maximum_results).await?;
    let matches: Vec<_> = results
        .into_iter()
        .map(|(id, versions)| {
            json!({
                "PackageIdentifier": id,
                "Versions": versions.into_iter().map(|v| json!({ "PackageVersion": v })).collect::<Vec<_>>(),
            })
        })
        .collect();

    Ok(Json(json!({
        "Matches": matches,
        "RequiredPackageMatchFields": ["PackageIdentifier"],
        "UnsupportedPackageMatchFields": ["Market", "NormalizedPackageNameAndPublisher"],
    }))
    .into_response())
}
