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
    models::{Comment, CommentRequest, CommentTarget, CreateCommentRequest},
};

use super::{pages::published_page, posts::published_post};

/// list_post_comments
///
/// [Public Route] Lists the comments of a published post, newest first.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn list_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<Vec<Comment>>> {
    published_post(&state.repo, post_id).await?;
    let comments = state.repo.list_comments(CommentTarget::Post(post_id)).await?;
    Ok(Json(comments))
}

/// list_page_comments
///
/// [Public Route] Lists the comments of a published page, newest first.
#[utoipa::path(
    get,
    path = "/pages/{id}/comments",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn list_page_comments(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> AppResult<Json<Vec<Comment>>> {
    published_page(&state.repo, page_id).await?;
    let comments = state.repo.list_comments(CommentTarget::Page(page_id)).await?;
    Ok(Json(comments))
}

/// get_my_comments
///
/// [Authenticated Route] Lists the comments written by the requesting user.
#[utoipa::path(
    get,
    path = "/me/comments",
    responses((status = 200, description = "My comments", body = [Comment]))
)]
pub async fn get_my_comments(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Comment>>> {
    Ok(Json(state.repo.list_user_comments(id).await?))
}

/// create_comment
///
/// [Authenticated Route] Posts a comment on exactly one post or page.
///
/// *Rules*: giving both or neither of `postId` / `pageId` is a 409; commenting on a target
/// with comments disabled is a 403.
#[utoipa::path(
    post,
    path = "/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 400, description = "Missing content"),
        (status = 403, description = "Comments disabled"),
        (status = 404, description = "Unknown post or page"),
        (status = 409, description = "Ambiguous target")
    )
)]
pub async fn create_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let target = payload.target()?;
    let comment = state
        .repo
        .create_comment(user_id, target, payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// update_comment
///
/// [Authenticated Route] Edits the text of the caller's own comment.
///
/// *Authorization*: Owner-Only. Someone else's comment is reported as 404.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment id")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 404, description = "Not Found or Not Owner")
    )
)]
pub async fn update_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CommentRequest>,
) -> AppResult<Json<Comment>> {
    let comment = state
        .repo
        .update_comment(id, user_id, payload.content)
        .await?;
    Ok(Json(comment))
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment. Authors may delete their own comments;
/// administrators may delete any comment.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found or Not Owner")
    )
)]
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let owner = if auth.is_admin() { None } else { Some(auth.id) };
    state.repo.delete_comment(id, owner).await?;
    Ok(StatusCode::NO_CONTENT)
}
