use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, hash_password},
    error::AppResult,
    extract::ValidatedJson,
    models::{
        CreateUserBioRequest, LanguageScoped, UpdateUserRequest, UserBio, UserBioRequest,
        UserRequest, UserResponse,
    },
};

/// register_user
///
/// [Public Route] Creates an account with the default `ROLE_USER` role.
///
/// *Note*: The password is bcrypt-hashed on the blocking pool before it reaches the
/// repository; neither the password nor the hash is ever returned.
#[utoipa::path(
    post,
    path = "/users",
    request_body = UserRequest,
    responses(
        (status = 201, description = "Registered", body = UserResponse),
        (status = 400, description = "Invalid username, email or password"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let hash = hash_password(payload.password.clone(), state.config.bcrypt_cost).await?;
    let user = state.repo.create_user(payload.into_new_user(hash)).await?;
    tracing::info!("registered user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// get_me
///
/// [Authenticated Route] Returns the requesting user's profile and role names.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserResponse))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(state.repo.get_user(id).await?))
}

// --- Bios ---

/// list_user_bios
///
/// [Public Route] Lists a user's biographies, one per language.
#[utoipa::path(
    get,
    path = "/users/{id}/bios",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Bios", body = [UserBio]))
)]
pub async fn list_user_bios(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<UserBio>>> {
    Ok(Json(state.repo.list_bios(user_id).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/bios/{language_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    responses(
        (status = 200, description = "Bio", body = UserBio),
        (status = 404, description = "No bio in this language")
    )
)]
pub async fn get_user_bio(
    State(state): State<AppState>,
    Path((user_id, language_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<UserBio>> {
    Ok(Json(state.repo.get_bio(user_id, language_id).await?))
}

/// create_my_bio
///
/// [Authenticated Route] Adds the caller's biography in one language.
#[utoipa::path(
    post,
    path = "/me/bios",
    request_body = CreateUserBioRequest,
    responses(
        (status = 201, description = "Created", body = UserBio),
        (status = 400, description = "Missing language or bio"),
        (status = 409, description = "Bio already exists for this language")
    )
)]
pub async fn create_my_bio(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserBioRequest>,
) -> AppResult<(StatusCode, Json<UserBio>)> {
    let (language_id, fields) = payload.into_parts()?;
    let bio = state.repo.create_bio(id, language_id, fields).await?;
    Ok((StatusCode::CREATED, Json(bio)))
}

#[utoipa::path(
    put,
    path = "/me/bios/{language_id}",
    params(("language_id" = Uuid, Path, description = "Language id")),
    request_body = UserBioRequest,
    responses(
        (status = 200, description = "Updated", body = UserBio),
        (status = 404, description = "No bio in this language")
    )
)]
pub async fn update_my_bio(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(language_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UserBioRequest>,
) -> AppResult<Json<UserBio>> {
    payload.ensure_language(language_id)?;
    Ok(Json(state.repo.update_bio(id, language_id, payload.fields).await?))
}

#[utoipa::path(
    delete,
    path = "/me/bios/{language_id}",
    params(("language_id" = Uuid, Path, description = "Language id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No bio in this language")
    )
)]
pub async fn delete_my_bio(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(language_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.repo.delete_bio(id, language_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Admin ---

/// list_users
///
/// [Admin Route] Lists all users ordered by username.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    auth.require_admin()?;
    Ok(Json(state.repo.list_users().await?))
}

#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User", body = UserResponse))
)]
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.get_user(id).await?))
}

/// update_user
///
/// [Admin Route] Partially updates a user. A new password is re-hashed; omitted fields
/// keep their stored value.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    auth.require_admin()?;
    let hash = match payload.password.clone() {
        Some(password) => Some(hash_password(password, state.config.bcrypt_cost).await?),
        None => None,
    };
    Ok(Json(state.repo.update_user(id, payload.into_changes(hash)).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.delete_user(id).await?;
    tracing::warn!("user {} deleted by {}", id, auth.id);
    Ok(StatusCode::NO_CONTENT)
}

/// assign_role
///
/// [Admin Route] Grants a role. Granting a role the user already holds is a no-op.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/roles/{role_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("role_id" = Uuid, Path, description = "Role id")
    ),
    responses((status = 200, description = "Role assigned", body = UserResponse))
)]
pub async fn assign_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, role_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<UserResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.assign_role(id, role_id).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}/roles/{role_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("role_id" = Uuid, Path, description = "Role id")
    ),
    responses((status = 200, description = "Role revoked", body = UserResponse))
)]
pub async fn revoke_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, role_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<UserResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.revoke_role(id, role_id).await?))
}
