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
    models::{Link, LinkRequest, LinkScope},
};

/// list_links
///
/// [Public Route] Lists all navigation links.
#[utoipa::path(
    get,
    path = "/links",
    responses((status = 200, description = "Links", body = [Link]))
)]
pub async fn list_links(State(state): State<AppState>) -> AppResult<Json<Vec<Link>>> {
    Ok(Json(state.repo.list_links(None).await?))
}

/// list_internal_links
///
/// [Public Route] Lists only the links that point inside the site.
#[utoipa::path(
    get,
    path = "/links/internal",
    responses((status = 200, description = "Internal links", body = [Link]))
)]
pub async fn list_internal_links(State(state): State<AppState>) -> AppResult<Json<Vec<Link>>> {
    Ok(Json(state.repo.list_links(Some(LinkScope::Internal)).await?))
}

#[utoipa::path(
    get,
    path = "/links/{id}",
    params(("id" = Uuid, Path, description = "Link id")),
    responses(
        (status = 200, description = "Link", body = Link),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_link(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Link>> {
    Ok(Json(state.repo.get_link(id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/links",
    request_body = LinkRequest,
    responses(
        (status = 201, description = "Created", body = Link),
        (status = 400, description = "Missing URL or scope")
    )
)]
pub async fn create_link(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LinkRequest>,
) -> AppResult<(StatusCode, Json<Link>)> {
    auth.require_admin()?;
    let link = state.repo.create_link(payload.into_fields()?).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[utoipa::path(
    put,
    path = "/admin/links/{id}",
    params(("id" = Uuid, Path, description = "Link id")),
    request_body = LinkRequest,
    responses((status = 200, description = "Updated", body = Link))
)]
pub async fn update_link(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<LinkRequest>,
) -> AppResult<Json<Link>> {
    auth.require_admin()?;
    Ok(Json(state.repo.update_link(id, payload.into_fields()?).await?))
}

/// delete_link
///
/// [Admin Route] Deletes a link. Pages, posts and homepages that referenced it keep
/// existing with their link cleared.
#[utoipa::path(
    delete,
    path = "/admin/links/{id}",
    params(("id" = Uuid, Path, description = "Link id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_link(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.delete_link(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
