use crate::{
    AppState,
    handlers::{homepages, languages, links, pages, posts, roles, settings, users},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Content management, reference data and user administration. Nested under `/admin`.
///
/// Access Control:
/// `create_router` applies the authentication layer; each handler then calls
/// `AuthUser::require_admin`, so a signed-in user without `ROLE_ADMIN` gets a 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Pages ---
        .route("/pages", get(pages::admin_list_pages).post(pages::create_page))
        .route(
            "/pages/{id}",
            get(pages::admin_get_page)
                .put(pages::update_page)
                .delete(pages::delete_page),
        )
        .route("/pages/{id}/publish", put(pages::publish_page))
        .route("/pages/{id}/unpublish", put(pages::unpublish_page))
        .route("/pages/{id}/content", post(pages::attach_page_content))
        .route(
            "/pages/{id}/content/{language_id}",
            put(pages::update_page_content).delete(pages::remove_page_content),
        )
        .route("/pages/{id}/authors", get(pages::admin_list_page_authors))
        .route(
            "/pages/{id}/authors/{user_id}",
            put(pages::assign_page_author).delete(pages::remove_page_author),
        )
        // --- Posts ---
        .route("/posts", get(posts::admin_list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::admin_get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/publish", put(posts::publish_post))
        .route("/posts/{id}/unpublish", put(posts::unpublish_post))
        .route("/posts/{id}/content", post(posts::attach_post_content))
        .route(
            "/posts/{id}/content/{language_id}",
            put(posts::update_post_content).delete(posts::remove_post_content),
        )
        .route("/posts/{id}/authors", get(posts::admin_list_post_authors))
        .route(
            "/posts/{id}/authors/{user_id}",
            put(posts::assign_post_author).delete(posts::remove_post_author),
        )
        // --- Homepages ---
        .route("/homepages", post(homepages::create_homepage))
        .route(
            "/homepages/{id}",
            put(homepages::update_homepage).delete(homepages::delete_homepage),
        )
        .route("/homepages/{id}/content", post(homepages::attach_homepage_content))
        .route(
            "/homepages/{id}/content/{language_id}",
            put(homepages::update_homepage_content).delete(homepages::remove_homepage_content),
        )
        // --- Reference data ---
        .route("/languages", post(languages::create_language))
        .route(
            "/languages/{id}",
            put(languages::update_language).delete(languages::delete_language),
        )
        .route("/links", post(links::create_link))
        .route(
            "/links/{id}",
            put(links::update_link).delete(links::delete_link),
        )
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route("/roles/name/{name}", get(roles::get_role_by_name))
        .route(
            "/roles/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        // --- Site ---
        .route("/settings", put(settings::update_settings))
        // --- Users ---
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/users/{id}/roles/{role_id}",
            put(users::assign_role).delete(users::revoke_role),
        )
}
