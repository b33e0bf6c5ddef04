/// Router Module Index
///
/// Routing split by access level. Authentication is applied per module with axum
/// layers in `create_router`, so a route's protection follows from the file it lives in.

/// Routes accessible to all clients (anonymous, read-only apart from registration).
pub mod public;

/// Routes protected by the `AuthUser` middleware.
pub mod authenticated;

/// Routes nested under `/admin`; handlers additionally require `ROLE_ADMIN`.
pub mod admin;
