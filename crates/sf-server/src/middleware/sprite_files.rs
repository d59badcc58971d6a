//! Sprite directory filter.
//!
//! The sprite directory defaults to the stream root, so it also holds source
//! assets and half-written publish temp files. Only `<stream_id>_sprite.jpg`
//! names reach the file service.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Middleware that answers 404 for anything but a published sprite name.
pub async fn sprite_files_only(request: Request<axum::body::Body>, next: Next) -> Response {
    let name = request.uri().path().trim_start_matches('/');
    if sf_core::parse_sprite_file_name(name).is_none() {
        tracing::debug!(path = %request.uri().path(), "Refusing non-sprite file");
        return AppError::from(sf_core::Error::not_found("sprite", name)).into_response();
    }
    next.run(request).await
}
