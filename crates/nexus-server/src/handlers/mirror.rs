//! `/mirror/<registry>/<path>` passthrough.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;

use crate::error_response::AppError;
use crate::responses::status_from_upstream;
use crate::AppState;

pub async fn fetch(
    State(state): State<AppState>,
    Path((registry, path)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let mirrored = state.mirror.fetch(&state.config, &registry, &path).await?;

    let mut response = Response::builder()
        .status(status_from_upstream(mirrored.status))
        .body(Body::from(mirrored.body))
        .expect("status and body are always valid for a Response");

    if let Some(content_type) = mirrored.content_type.as_deref() {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=600"));

    Ok(response)
}
