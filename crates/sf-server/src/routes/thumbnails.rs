//! Sprite metadata route handler.

use axum::extract::{Path, State};
use axum::Json;

use sf_core::{EpisodeId, SpriteMetadata};

use crate::context::AppContext;
use crate::error::{AppError, ErrorBody};

/// GET /thumbnails/episode/{episode_id}/sprite.json
///
/// Generates the sprite on first request for the episode's stream.
#[utoipa::path(
    get,
    path = "/thumbnails/episode/{episode_id}/sprite.json",
    params(("episode_id" = String, Path, description = "Episode identifier")),
    responses(
        (status = 200, description = "Sprite metadata", body = SpriteMetadata),
        (status = 400, description = "Malformed episode id", body = ErrorBody),
        (status = 404, description = "Unknown episode", body = ErrorBody),
        (status = 500, description = "Sprite generation failed", body = ErrorBody)
    )
)]
pub async fn sprite_metadata(
    State(ctx): State<AppContext>,
    Path(episode_id): Path<String>,
) -> Result<Json<SpriteMetadata>, AppError> {
    let episode_id: EpisodeId = episode_id.parse()?;
    let metadata = ctx.sprites.sprite_metadata(&episode_id).await?;
    Ok(Json(metadata))
}
