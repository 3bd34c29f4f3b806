//! `/_docs/...` static documentation endpoints.

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

pub async fn openapi_json() -> Response {
    Json(json!({
        "openapi": "3.0.3",
        "info": { "title": "nexus", "version": env!("CARGO_PKG_VERSION") },
        "paths": {
            "/cdn/npm/{path}": { "get": { "summary": "npm file or directory listing" } },
            "/cdn/jsr/{path}": { "get": { "summary": "JSR file or directory listing" } },
            "/cdn/gh/{path}": { "get": { "summary": "GitHub file or directory listing" } },
            "/cdn/cdnjs/{path}": { "get": { "summary": "cdnjs file or directory listing" } },
            "/cdn/wp/{path}": { "get": { "summary": "WordPress plugin/theme file" } },
            "/mirror/{registry}/{path}": { "get": { "summary": "raw upstream passthrough" } },
            "/registry/winget/packages": { "get": { "summary": "paginated package list" } },
            "/registry/winget/packages/{id}": { "get": { "summary": "package summary" } },
            "/registry/winget/packages/{id}/versions": { "get": { "summary": "version list" } },
            "/registry/winget/packages/{id}/versions/{v}": { "get": { "summary": "version metadata" } },
            "/registry/winget/manifestSearch": {
                "get": { "summary": "search by PackageIdentifier" },
                "post": { "summary": "search by PackageIdentifier" }
            }
        }
    }))
    .into_response()
}

pub async fn scalar() -> Response {
    html_page(
        "nexus docs",
        r#"<script id="api-reference" data-url="/_docs/openapi.json"></script>
<script src="https://cdn.jsdelivr.net/npm/@scalar/api-reference"></script>"#,
    )
}

pub async fn swagger() -> Response {
    html_page(
        "nexus docs",
        r#"<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist/swagger-ui-bundle.js"></script>
<script>window.onload = () => SwaggerUIBundle({ url: "/_docs/openapi.json", dom_id: "#swagger-ui" });</script>"#,
    )
}

fn html_page(title: &str, body: &str) -> Response {
    let html = format!("<!doctype html><html><head><title>{title}</title></head><body>{body}</body></html>");
    let mut response = Response::new(html.into());
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}
