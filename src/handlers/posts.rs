use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, AppResult},
    extract::ValidatedJson,
    models::{
        ArticleContentRequest, Author, CreateArticleContentRequest, LanguageScoped, PostContent,
        PostRequest, PostResponse,
    },
    repository::RepositoryState,
};

/// Loads a post for anonymous readers. Drafts are reported as missing.
pub(crate) async fn published_post(repo: &RepositoryState, id: Uuid) -> AppResult<PostResponse> {
    let post = repo.get_post(id).await?;
    if !post.published {
        return Err(ApiError::not_found("Post", id));
    }
    Ok(post)
}

// --- Public ---

/// list_posts
///
/// [Public Route] Lists published posts, newest first, each with all of its language variants.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "Published posts", body = [PostResponse]))
)]
pub async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(Json(state.repo.list_posts(true).await?))
}

/// get_post
///
/// [Public Route] Retrieves a published post with its full content set.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Unknown or unpublished post")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PostResponse>> {
    Ok(Json(published_post(&state.repo, id).await?))
}

/// list_post_contents
///
/// [Public Route] Lists the language variants of a published post.
#[utoipa::path(
    get,
    path = "/posts/{id}/content",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Post contents", body = [PostContent]))
)]
pub async fn list_post_contents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<PostContent>>> {
    let post = published_post(&state.repo, id).await?;
    Ok(Json(post.contents))
}

/// get_post_content
///
/// [Public Route] Retrieves one language variant of a published post.
#[utoipa::path(
    get,
    path = "/posts/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    responses(
        (status = 200, description = "Post content", body = PostContent),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn get_post_content(
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<PostContent>> {
    published_post(&state.repo, id).await?;
    Ok(Json(state.repo.get_post_content(id, language_id).await?))
}

/// list_post_authors
///
/// [Public Route] Lists the users credited on a published post.
#[utoipa::path(
    get,
    path = "/posts/{id}/authors",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Authors", body = [Author]),
        (status = 404, description = "Unknown or unpublished post")
    )
)]
pub async fn list_post_authors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Author>>> {
    published_post(&state.repo, id).await?;
    Ok(Json(state.repo.list_post_authors(id).await?))
}

/// list_user_posts
///
/// [Public Route] Lists the published posts a user is credited on, newest first.
#[utoipa::path(
    get,
    path = "/users/{id}/posts",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Authored posts", body = [PostResponse]),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(Json(state.repo.list_posts_by_author(id, true).await?))
}

// --- Admin ---

/// admin_list_posts
///
/// [Admin Route] Lists every post, drafts included.
#[utoipa::path(
    get,
    path = "/admin/posts",
    responses(
        (status = 200, description = "All posts", body = [PostResponse]),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn admin_list_posts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PostResponse>>> {
    auth.require_admin()?;
    Ok(Json(state.repo.list_posts(false).await?))
}

/// admin_get_post
///
/// [Admin Route] Retrieves any post, published or not.
#[utoipa::path(
    get,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Post", body = PostResponse))
)]
pub async fn admin_get_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PostResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.get_post(id).await?))
}

/// create_post
///
/// [Admin Route] Creates a post shell without content. Unlike pages, a post must reference a link.
#[utoipa::path(
    post,
    path = "/admin/posts",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Created", body = PostResponse),
        (status = 400, description = "Missing link or flags"),
        (status = 404, description = "Unknown link")
    )
)]
pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PostRequest>,
) -> AppResult<(StatusCode, Json<PostResponse>)> {
    auth.require_admin()?;
    let post = state.repo.create_post(payload.into_meta()?).await?;
    tracing::info!("post {} created by {}", post.id, auth.id);
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Admin Route] Replaces the link, thumbnail and flags of a post. Contents are untouched.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = PostRequest,
    responses((status = 200, description = "Updated", body = PostResponse))
)]
pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<PostRequest>,
) -> AppResult<Json<PostResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.update_post(id, payload.into_meta()?).await?))
}

/// publish_post
///
/// [Admin Route] Makes a post visible to anonymous readers.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}/publish",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Published", body = PostResponse))
)]
pub async fn publish_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PostResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.set_post_published(id, true).await?))
}

/// unpublish_post
///
/// [Admin Route] Turns a post back into a draft.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}/unpublish",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Unpublished", body = PostResponse))
)]
pub async fn unpublish_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PostResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.set_post_published(id, false).await?))
}

/// delete_post
///
/// [Admin Route] Deletes a post together with its contents and comments.
#[utoipa::path(
    delete,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.delete_post(id).await?;
    tracing::info!("post {} deleted by {}", id, auth.id);
    Ok(StatusCode::NO_CONTENT)
}

/// attach_post_content
///
/// [Admin Route] Adds the variant for one language. A post holds at most one variant per
/// language; a second attach for the same language is a 409 naming the language.
#[utoipa::path(
    post,
    path = "/admin/posts/{id}/content",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = CreateArticleContentRequest,
    responses(
        (status = 201, description = "Attached", body = PostContent),
        (status = 400, description = "Missing language, title or content"),
        (status = 404, description = "Unknown post or language"),
        (status = 409, description = "Language already present")
    )
)]
pub async fn attach_post_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateArticleContentRequest>,
) -> AppResult<(StatusCode, Json<PostContent>)> {
    auth.require_admin()?;
    let (language_id, fields) = payload.into_parts()?;
    let content = state.repo.attach_post_content(id, language_id, fields).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

/// update_post_content
///
/// [Admin Route] Replaces the text of one variant. The language itself cannot change.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    request_body = ArticleContentRequest,
    responses(
        (status = 200, description = "Updated", body = PostContent),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn update_post_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<ArticleContentRequest>,
) -> AppResult<Json<PostContent>> {
    auth.require_admin()?;
    payload.ensure_language(language_id)?;
    Ok(Json(state.repo.update_post_content(id, language_id, payload.fields).await?))
}

/// remove_post_content
///
/// [Admin Route] Deletes one variant.
#[utoipa::path(
    delete,
    path = "/admin/posts/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn remove_post_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.remove_post_content(id, language_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// admin_list_post_authors
///
/// [Admin Route] Lists the authors of any post, drafts included.
#[utoipa::path(
    get,
    path = "/admin/posts/{id}/authors",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Authors", body = [Author]))
)]
pub async fn admin_list_post_authors(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Author>>> {
    auth.require_admin()?;
    Ok(Json(state.repo.list_post_authors(id).await?))
}

/// assign_post_author
///
/// [Admin Route] Credits a user on a post. Assigning an existing author changes nothing.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}/authors/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Authors after the change", body = [Author]),
        (status = 404, description = "Unknown post or user")
    )
)]
pub async fn assign_post_author(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<Author>>> {
    auth.require_admin()?;
    let authors = state.repo.assign_post_author(id, user_id).await?;
    tracing::info!("user {} credited on post {} by {}", user_id, id, auth.id);
    Ok(Json(authors))
}

/// remove_post_author
///
/// [Admin Route] Removes a user's credit from a post.
#[utoipa::path(
    delete,
    path = "/admin/posts/{id}/authors/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not an author of this post")
    )
)]
pub async fn remove_post_author(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.remove_post_author(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
