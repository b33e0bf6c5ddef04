use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod localized;
pub mod models;
pub mod repository;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::languages::list_languages, handlers::languages::get_language,
        handlers::languages::create_language, handlers::languages::update_language,
        handlers::languages::delete_language,
        handlers::links::list_links, handlers::links::list_internal_links, handlers::links::get_link,
        handlers::links::create_link, handlers::links::update_link, handlers::links::delete_link,
        handlers::roles::list_roles, handlers::roles::get_role, handlers::roles::get_role_by_name,
        handlers::roles::create_role, handlers::roles::update_role, handlers::roles::delete_role,
        handlers::users::register_user, handlers::users::get_me,
        handlers::users::list_user_bios, handlers::users::get_user_bio,
        handlers::users::create_my_bio, handlers::users::update_my_bio, handlers::users::delete_my_bio,
        handlers::users::list_users, handlers::users::get_user, handlers::users::update_user,
        handlers::users::delete_user, handlers::users::assign_role, handlers::users::revoke_role,
        handlers::pages::list_pages, handlers::pages::get_page,
        handlers::pages::list_page_contents, handlers::pages::get_page_content,
        handlers::pages::admin_list_pages, handlers::pages::admin_get_page,
        handlers::pages::create_page, handlers::pages::update_page,
        handlers::pages::publish_page, handlers::pages::unpublish_page, handlers::pages::delete_page,
        handlers::pages::attach_page_content, handlers::pages::update_page_content,
        handlers::pages::remove_page_content,
        handlers::pages::list_page_authors, handlers::pages::list_user_pages,
        handlers::pages::admin_list_page_authors, handlers::pages::assign_page_author,
        handlers::pages::remove_page_author,
        handlers::posts::list_posts, handlers::posts::get_post,
        handlers::posts::list_post_contents, handlers::posts::get_post_content,
        handlers::posts::admin_list_posts, handlers::posts::admin_get_post,
        handlers::posts::create_post, handlers::posts::update_post,
        handlers::posts::publish_post, handlers::posts::unpublish_post, handlers::posts::delete_post,
        handlers::posts::attach_post_content, handlers::posts::update_post_content,
        handlers::posts::remove_post_content,
        handlers::posts::list_post_authors, handlers::posts::list_user_posts,
        handlers::posts::admin_list_post_authors, handlers::posts::assign_post_author,
        handlers::posts::remove_post_author,
        handlers::homepages::list_homepages, handlers::homepages::get_homepage,
        handlers::homepages::list_homepage_contents, handlers::homepages::get_homepage_content,
        handlers::homepages::create_homepage, handlers::homepages::update_homepage,
        handlers::homepages::delete_homepage, handlers::homepages::attach_homepage_content,
        handlers::homepages::update_homepage_content, handlers::homepages::remove_homepage_content,
        handlers::comments::list_post_comments, handlers::comments::list_page_comments,
        handlers::comments::get_my_comments, handlers::comments::create_comment,
        handlers::comments::update_comment, handlers::comments::delete_comment,
        handlers::settings::get_settings, handlers::settings::update_settings,
    ),
    components(
        schemas(
            error::ErrorResponse, error::FieldViolation,
            models::Language, models::LanguageRequest,
            models::Link, models::LinkRequest, models::LinkScope,
            models::Role, models::RoleRequest,
            models::UserResponse, models::UserRequest, models::UpdateUserRequest, models::Author,
            models::UserBio, models::BioFields, models::CreateUserBioRequest, models::UserBioRequest,
            models::Page, models::PageContent, models::PageRequest, models::PageResponse,
            models::Post, models::PostContent, models::PostRequest, models::PostResponse,
            models::Homepage, models::HomepageContent, models::HomepageRequest,
            models::HomepageFields, models::CreateHomepageContentRequest,
            models::HomepageContentRequest, models::HomepageResponse,
            models::ArticleFields, models::CreateArticleContentRequest, models::ArticleContentRequest,
            models::Comment, models::CommentTarget, models::CreateCommentRequest,
            models::CommentRequest,
            models::GlobalSettings, models::GlobalSettingsRequest,
        )
    ),
    tags(
        (name = "refarch-cms", description = "Multilingual content management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: the single, cloneable container of the
/// services and configuration shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull single components out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the routes it wraps. Extracting `AuthUser` either succeeds
/// or rejects the request with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no middleware.
        .merge(public::public_routes())
        // Authenticated Routes: protected by `auth_middleware`.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin Routes: authenticated here, `ROLE_ADMIN` checked inside each handler.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // Observability and correlation layers.
    base_router
        .layer(
            ServiceBuilder::new()
                // Generates a UUID request id for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Wraps the request/response lifecycle in a span carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span: HTTP method, URI and the `x-request-id` header, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
