//! Admin tools route handler.

use axum::extract::State;
use axum::Json;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/admin/tools
#[utoipa::path(
    get,
    path = "/api/admin/tools",
    responses(
        (status = 200, description = "List external tool availability", body = Vec<sf_av::ToolInfo>)
    )
)]
pub async fn tools(State(ctx): State<AppContext>) -> Result<Json<Vec<sf_av::ToolInfo>>, AppError> {
    // Version detection spawns the tools synchronously.
    let tools = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .map_err(|e| sf_core::Error::Internal(format!("spawn_blocking join error: {e}")))?;
    Ok(Json(infos))
}
