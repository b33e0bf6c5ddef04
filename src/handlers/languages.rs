use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    extract::ValidatedJson,
    models::{Language, LanguageRequest},
};

/// list_languages
///
/// [Public Route] Lists the languages content can be written in, ordered by name.
#[utoipa::path(
    get,
    path = "/languages",
    responses((status = 200, description = "Languages", body = [Language]))
)]
pub async fn list_languages(State(state): State<AppState>) -> AppResult<Json<Vec<Language>>> {
    Ok(Json(state.repo.list_languages().await?))
}

#[utoipa::path(
    get,
    path = "/languages/{id}",
    params(("id" = Uuid, Path, description = "Language id")),
    responses(
        (status = 200, description = "Language", body = Language),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_language(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Language>> {
    Ok(Json(state.repo.get_language(id).await?))
}

/// create_language
///
/// [Admin Route] Registers a language. Abbreviations are unique.
#[utoipa::path(
    post,
    path = "/admin/languages",
    request_body = LanguageRequest,
    responses(
        (status = 201, description = "Created", body = Language),
        (status = 409, description = "Abbreviation already used")
    )
)]
pub async fn create_language(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LanguageRequest>,
) -> AppResult<(StatusCode, Json<Language>)> {
    auth.require_admin()?;
    let language = state.repo.create_language(payload).await?;
    tracing::info!("language {} ({}) created", language.abbreviation, language.id);
    Ok((StatusCode::CREATED, Json(language)))
}

#[utoipa::path(
    put,
    path = "/admin/languages/{id}",
    params(("id" = Uuid, Path, description = "Language id")),
    request_body = LanguageRequest,
    responses((status = 200, description = "Updated", body = Language))
)]
pub async fn update_language(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<LanguageRequest>,
) -> AppResult<Json<Language>> {
    auth.require_admin()?;
    Ok(Json(state.repo.update_language(id, payload).await?))
}

/// delete_language
///
/// [Admin Route] Deletes a language that no content or bio uses any more.
#[utoipa::path(
    delete,
    path = "/admin/languages/{id}",
    params(("id" = Uuid, Path, description = "Language id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 409, description = "Language still in use")
    )
)]
pub async fn delete_language(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.delete_language(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
