//! Maps [`NexusError`] onto HTTP status codes. `NexusError` itself carries no
//! HTTP types, so the mapping lives here behind a local newtype — neither
//! `NexusError` nor `IntoResponse` is defined in this crate, so a direct impl
//! would violate the orphan rule.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nexus_core::NexusError;
use serde_json::json;

pub struct AppError(pub NexusError);

impl From<NexusError> for AppError {
    fn from(err: NexusError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NexusError::BadRequest(_) | NexusError::Other(_) => StatusCode::BAD_REQUEST,
            NexusError::PackageNotFound { .. }
            | NexusError::VersionNotFound { .. }
            | NexusError::FileNotFound { .. } => StatusCode::NOT_FOUND,
            NexusError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            NexusError::StorageUnavailable(_) | NexusError::InvalidManifest(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.0.code(),
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: NexusError) -> StatusCode {
        AppError(err).into_response().status()
    }

    #[test]
    fn not_found_family_maps_to_404() {
        assert_eq!(status_of(NexusError::package_not_found("npm", "left-pad")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(NexusError::version_not_found("left-pad", "^99")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(NexusError::file_not_found("left-pad", "1.0.0", "x.js")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn bad_request_maps_to_400() {
        assert_eq!(status_of(NexusError::bad_request("nonsense")), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_unavailable_maps_to_502() {
        assert_eq!(status_of(NexusError::upstream_unavailable("timeout")), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn storage_failure_maps_to_500() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(status_of(io_err.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
