//! Axum router construction.
//!
//! Builds the application router: the sprite metadata route, the static
//! sprite directory under the public prefix, operational endpoints and the
//! middleware stack.

use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::middleware::sprite_files::sprite_files_only;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::thumbnails::sprite_metadata,
        routes::health::health_check,
        routes::admin::tools,
    ),
    components(schemas(
        sf_core::SpriteMetadata,
        crate::error::ErrorBody,
        routes::health::HealthResponse,
        sf_av::ToolInfo,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let storage = ctx.sprites.storage().clone();

    let mut app = Router::new()
        .route(
            "/thumbnails/episode/{episode_id}/sprite.json",
            get(routes::thumbnails::sprite_metadata),
        )
        .route("/health", get(routes::health::health_check))
        .route("/api/admin/tools", get(routes::admin::tools))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/metrics", get(routes::metrics::metrics_handler));

    // Published sprites are plain files under the public prefix.
    if storage.public_prefix().is_empty() {
        tracing::warn!("storage.public_prefix is '/'; sprites will not be served");
    } else {
        let sprites = Router::new()
            .route_service("/{file}", ServeDir::new(storage.sprite_dir()))
            .layer(middleware::from_fn(sprite_files_only));
        app = app.nest(storage.public_prefix(), sprites);
    }

    let mut app = app
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Static file serving for a UI build.
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        } else {
            tracing::warn!("Static directory {:?} does not exist; not serving UI", dir);
        }
    }

    app
}
