use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{ApiError, AppResult},
    models::role::ROLE_ADMIN,
    repository::RepositoryState,
};

/// Claims
///
/// Payload expected inside an HS256 JSON Web Token. Tokens are issued by an external
/// identity provider sharing `JWT_SECRET`; this service only validates them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the user in the `users` table.
    pub sub: Uuid,
    /// Expiration Time (exp): timestamp after which the JWT must not be accepted.
    pub exp: usize,
    /// Issued At (iat)
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Role names are loaded from the
/// database on every request, so revoking a role takes effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }

    /// Fails with `Forbidden` unless the user holds `ROLE_ADMIN`.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!("user {} attempted an admin operation", self.id);
            Err(ApiError::forbidden("Administrator role required"))
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The process is:
/// 1. Local bypass: in `Env::Local` a valid user id in `x-user-id` is accepted.
/// 2. Bearer token extraction and HS256 decoding with expiry validation.
/// 3. User lookup, so deleted users are rejected even with a valid token.
///
/// Rejection: `ApiError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let header_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());
            if let Some(user_id) = header_id {
                if let Ok(user) = repo.get_user(user_id).await {
                    return Ok(AuthUser {
                        id: user.id,
                        roles: user.roles,
                    });
                }
            }
        }
        // Production, or the bypass failed: fall through to JWT validation.

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("rejected bearer token: {:?}", e.kind());
            ApiError::Unauthorized
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            roles: user.roles,
        })
    }
}

/// hash_password
///
/// Hashes on the blocking pool; bcrypt is CPU-bound and would stall the runtime.
pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}
