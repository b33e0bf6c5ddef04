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
    models::{
        CreateHomepageContentRequest, HomepageContent, HomepageContentRequest, HomepageRequest,
        HomepageResponse, LanguageScoped,
    },
};

/// list_homepages
///
/// [Public Route] Lists every homepage with its language variants. Homepages have no
/// draft state.
#[utoipa::path(
    get,
    path = "/homepages",
    responses((status = 200, description = "Homepages", body = [HomepageResponse]))
)]
pub async fn list_homepages(State(state): State<AppState>) -> AppResult<Json<Vec<HomepageResponse>>> {
    Ok(Json(state.repo.list_homepages().await?))
}

/// get_homepage
///
/// [Public Route] Retrieves one homepage with its full content set.
#[utoipa::path(
    get,
    path = "/homepages/{id}",
    params(("id" = Uuid, Path, description = "Homepage id")),
    responses(
        (status = 200, description = "Homepage", body = HomepageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_homepage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<HomepageResponse>> {
    Ok(Json(state.repo.get_homepage(id).await?))
}

#[utoipa::path(
    get,
    path = "/homepages/{id}/content",
    params(("id" = Uuid, Path, description = "Homepage id")),
    responses((status = 200, description = "Homepage contents", body = [HomepageContent]))
)]
pub async fn list_homepage_contents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<HomepageContent>>> {
    Ok(Json(state.repo.list_homepage_contents(id).await?))
}

#[utoipa::path(
    get,
    path = "/homepages/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Homepage id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    responses(
        (status = 200, description = "Homepage content", body = HomepageContent),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn get_homepage_content(
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<HomepageContent>> {
    Ok(Json(state.repo.get_homepage_content(id, language_id).await?))
}

/// create_homepage
///
/// [Admin Route] Creates an empty homepage. The link is optional.
#[utoipa::path(
    post,
    path = "/admin/homepages",
    request_body = HomepageRequest,
    responses(
        (status = 201, description = "Created", body = HomepageResponse),
        (status = 404, description = "Unknown link")
    )
)]
pub async fn create_homepage(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<HomepageRequest>,
) -> AppResult<(StatusCode, Json<HomepageResponse>)> {
    auth.require_admin()?;
    let homepage = state.repo.create_homepage(payload).await?;
    Ok((StatusCode::CREATED, Json(homepage)))
}

#[utoipa::path(
    put,
    path = "/admin/homepages/{id}",
    params(("id" = Uuid, Path, description = "Homepage id")),
    request_body = HomepageRequest,
    responses((status = 200, description = "Updated", body = HomepageResponse))
)]
pub async fn update_homepage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<HomepageRequest>,
) -> AppResult<Json<HomepageResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.update_homepage(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/homepages/{id}",
    params(("id" = Uuid, Path, description = "Homepage id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_homepage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.delete_homepage(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// attach_homepage_content
///
/// [Admin Route] Adds the sections for one language. Only the welcome message is required.
#[utoipa::path(
    post,
    path = "/admin/homepages/{id}/content",
    params(("id" = Uuid, Path, description = "Homepage id")),
    request_body = CreateHomepageContentRequest,
    responses(
        (status = 201, description = "Attached", body = HomepageContent),
        (status = 400, description = "Missing language or welcome message"),
        (status = 404, description = "Unknown homepage or language"),
        (status = 409, description = "Language already present")
    )
)]
pub async fn attach_homepage_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateHomepageContentRequest>,
) -> AppResult<(StatusCode, Json<HomepageContent>)> {
    auth.require_admin()?;
    let (language_id, fields) = payload.into_parts()?;
    let content = state
        .repo
        .attach_homepage_content(id, language_id, fields)
        .await?;
    Ok((StatusCode::CREATED, Json(content)))
}

#[utoipa::path(
    put,
    path = "/admin/homepages/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Homepage id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    request_body = HomepageContentRequest,
    responses(
        (status = 200, description = "Updated", body = HomepageContent),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn update_homepage_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<HomepageContentRequest>,
) -> AppResult<Json<HomepageContent>> {
    auth.require_admin()?;
    payload.ensure_language(language_id)?;
    Ok(Json(
        state
            .repo
            .update_homepage_content(id, language_id, payload.fields)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/admin/homepages/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Homepage id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn remove_homepage_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.remove_homepage_content(id, language_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
