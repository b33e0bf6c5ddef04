use crate::{
    AppState,
    handlers::{comments, users},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any signed-in user: their own profile, comments and biographies.
///
/// Access Control Strategy:
/// The router is wrapped in the auth middleware by `create_router`, so every handler
/// receives a validated `AuthUser`. Ownership checks (comments, bios) use that id.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(users::get_me))
        // GET /me/comments
        .route("/me/comments", get(comments::get_my_comments))
        // POST /comments
        // Exactly one of postId / pageId; the target must accept comments.
        .route("/comments", post(comments::create_comment))
        // PUT/DELETE /comments/{id}
        // Owner-Only, except that administrators may delete any comment.
        .route(
            "/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        // --- Bios of the caller ---
        .route("/me/bios", post(users::create_my_bio))
        .route(
            "/me/bios/{language_id}",
            put(users::update_my_bio).delete(users::delete_my_bio),
        )
}
