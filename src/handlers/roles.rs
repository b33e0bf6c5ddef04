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
    models::{Role, RoleRequest},
};

/// list_roles
///
/// [Admin Route] Lists all roles, ordered by name.
#[utoipa::path(
    get,
    path = "/admin/roles",
    responses((status = 200, description = "Roles", body = [Role]))
)]
pub async fn list_roles(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    auth.require_admin()?;
    Ok(Json(state.repo.list_roles().await?))
}

#[utoipa::path(
    get,
    path = "/admin/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses((status = 200, description = "Role", body = Role))
)]
pub async fn get_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Role>> {
    auth.require_admin()?;
    Ok(Json(state.repo.get_role(id).await?))
}

/// get_role_by_name
///
/// [Admin Route] Looks a role up by its exact name, e.g. `ROLE_EDITOR`.
#[utoipa::path(
    get,
    path = "/admin/roles/name/{name}",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_role_by_name(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Role>> {
    auth.require_admin()?;
    Ok(Json(state.repo.get_role_by_name(&name).await?))
}

#[utoipa::path(
    post,
    path = "/admin/roles",
    request_body = RoleRequest,
    responses(
        (status = 201, description = "Created", body = Role),
        (status = 409, description = "Name already used")
    )
)]
pub async fn create_role(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RoleRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    auth.require_admin()?;
    let role = state.repo.create_role(payload).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    put,
    path = "/admin/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = RoleRequest,
    responses((status = 200, description = "Updated", body = Role))
)]
pub async fn update_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RoleRequest>,
) -> AppResult<Json<Role>> {
    auth.require_admin()?;
    Ok(Json(state.repo.update_role(id, payload).await?))
}

/// delete_role
///
/// [Admin Route] Deletes a role and removes it from every user holding it.
#[utoipa::path(
    delete,
    path = "/admin/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.delete_role(id).await?;
    tracing::warn!("role {} deleted by {}", id, auth.id);
    Ok(StatusCode::NO_CONTENT)
}
