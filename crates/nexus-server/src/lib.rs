//! The Nexus HTTP surface: CDN routes, WinGet registry routes, mirror
//! passthrough, and static docs, wired over axum.

pub mod cdn_path;
pub mod content_type;
pub mod entry_file;
pub mod error_response;
mod handlers;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;
use nexus_bundler::Bundler;
use nexus_cache::PackageCache;
use nexus_core::NexusConfig;
use nexus_mirror::Mirror;
use nexus_resolver::Resolver;
use nexus_winget::WinGetIndex;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Everything a request handler needs, cheaply `Clone`d into every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<NexusConfig>,
    pub cache: PackageCache,
    pub resolver: Arc<Resolver>,
    pub winget: WinGetIndex,
    pub mirror: Arc<Mirror>,
    pub bundler: Bundler,
}

impl AppState {
    #[must_use]
    pub fn new(config: NexusConfig, cache: PackageCache, winget: WinGetIndex) -> Self {
        Self {
            config: Arc::new(config),
            cache: cache.clone(),
            resolver: Arc::new(Resolver::new()),
            winget,
            mirror: Arc::new(Mirror::new()),
            bundler: Bundler::new(cache),
        }
    }
}

/// Build the full router: CDN ecosystems, mirror passthrough, WinGet
/// registry routes, and docs, all under a permissive CORS layer.
#[must_use]
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/cdn/npm/*rest", get(handlers::cdn::npm))
        .route("/cdn/jsr/*rest", get(handlers::cdn::jsr))
        .route("/cdn/gh/*rest", get(handlers::cdn::gh))
        .route("/cdn/cdnjs/*rest", get(handlers::cdn::cdnjs))
        .route("/cdn/wp/*rest", get(handlers::cdn::wp))
        .route("/mirror/:registry/*path", get(handlers::mirror::fetch))
        .route("/registry/winget/packages", get(handlers::winget::list_packages))
        .route("/registry/winget/packages/:id", get(handlers::winget::package_summary))
        .route("/registry/winget/packages/:id/versions", get(handlers::winget::version_list))
        .route("/registry/winget/packages/:id/versions/:v", get(handlers::winget::version_detail))
        .route("/registry/winget/packages/:id/versions/:v/locales", get(handlers::winget::locales))
        .route(
            "/registry/winget/packages/:id/versions/:v/locales/:locale",
            get(handlers::winget::locale_detail),
        )
        .route("/registry/winget/packages/:id/versions/:v/installers", get(handlers::winget::installers))
        .route(
            "/registry/winget/packages/:id/versions/:v/installers/:installer_id",
            get(handlers::winget::installer_detail),
        )
        .route(
            "/registry/winget/manifestSearch",
            get(handlers::winget::search_get).post(handlers::winget::search_post),
        )
        .route("/_docs/openapi.json", get(handlers::docs::openapi_json))
        .route("/_docs/scalar", get(handlers::docs::scalar))
        .route("/_docs/swagger", get(handlers::docs::swagger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
