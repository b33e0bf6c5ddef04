use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    extract::ValidatedJson,
    models::{GlobalSettings, GlobalSettingsRequest},
};

/// get_settings
///
/// [Public Route] Returns the site-wide settings. 404 until an administrator has saved them.
#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Current settings", body = GlobalSettings),
        (status = 404, description = "Settings not saved yet")
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<GlobalSettings>> {
    Ok(Json(state.repo.get_settings().await?))
}

/// update_settings
///
/// [Admin Route] Replaces the site-wide settings, creating them on first use.
///
/// *Note*: Turning `globalCommentsEnabled` off closes every post and page for new comments,
/// whatever their own flag says.
#[utoipa::path(
    put,
    path = "/admin/settings",
    request_body = GlobalSettingsRequest,
    responses(
        (status = 200, description = "Saved settings", body = GlobalSettings),
        (status = 400, description = "Missing or non-positive values"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<GlobalSettingsRequest>,
) -> AppResult<Json<GlobalSettings>> {
    auth.require_admin()?;
    let settings = state.repo.save_settings(payload.into_changes()?).await?;
    tracing::info!("global settings saved by {}", auth.id);
    Ok(Json(settings))
}
