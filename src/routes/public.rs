use crate::{
    AppState,
    handlers::{comments, homepages, languages, links, pages, posts, settings, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are **unauthenticated** and accessible to any client. Apart from
/// registration these are reads.
///
/// Visibility Mandate:
/// Page and post handlers in this module only ever return published records; drafts are
/// reported as 404 and are reachable through `/admin` only.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Used by monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /users
        // Registration. New accounts receive ROLE_USER.
        .route("/users", post(users::register_user))
        // GET /settings
        // Site name, default language and feature switches for the frontend.
        .route("/settings", get(settings::get_settings))
        // --- Reference data ---
        .route("/languages", get(languages::list_languages))
        .route("/languages/{id}", get(languages::get_language))
        .route("/links", get(links::list_links))
        // Static segment wins over `{id}` in axum's router.
        .route("/links/internal", get(links::list_internal_links))
        .route("/links/{id}", get(links::get_link))
        // --- Pages ---
        .route("/pages", get(pages::list_pages))
        .route("/pages/{id}", get(pages::get_page))
        .route("/pages/{id}/content", get(pages::list_page_contents))
        .route("/pages/{id}/content/{language_id}", get(pages::get_page_content))
        .route("/pages/{id}/comments", get(comments::list_page_comments))
        .route("/pages/{id}/authors", get(pages::list_page_authors))
        // --- Posts ---
        .route("/posts", get(posts::list_posts))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}/content", get(posts::list_post_contents))
        .route("/posts/{id}/content/{language_id}", get(posts::get_post_content))
        .route("/posts/{id}/comments", get(comments::list_post_comments))
        .route("/posts/{id}/authors", get(posts::list_post_authors))
        // --- Homepages ---
        .route("/homepages", get(homepages::list_homepages))
        .route("/homepages/{id}", get(homepages::get_homepage))
        .route("/homepages/{id}/content", get(homepages::list_homepage_contents))
        .route(
            "/homepages/{id}/content/{language_id}",
            get(homepages::get_homepage_content),
        )
        // --- Authors ---
        .route("/users/{id}/bios", get(users::list_user_bios))
        .route("/users/{id}/bios/{language_id}", get(users::get_user_bio))
        .route("/users/{id}/pages", get(pages::list_user_pages))
        .route("/users/{id}/posts", get(posts::list_user_posts))
}
