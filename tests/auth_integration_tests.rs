use axum::{
    extract::FromRequestParts,
    http::{Method, Request, Uri, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use refarch_cms::{
    ApiError, AppState, InMemoryRepository,
    auth::{AuthUser, Claims},
    config::{AppConfig, Env},
    models::{NewUser, role::ROLE_USER},
};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "auth-integration-test-secret";

// --- Helpers ---

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Signs a token for `user_id` expiring `offset_secs` from now (negative means already expired).
fn create_token(user_id: Uuid, offset_secs: i64, secret: &str) -> String {
    let now = now_secs();
    let claims = Claims {
        sub: user_id,
        exp: (now as i64 + offset_secs) as usize,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn create_app_state(env: Env) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..Default::default()
    };
    AppState {
        repo: Arc::new(InMemoryRepository::new()),
        config,
    }
}

async fn seed_user(state: &AppState) -> Uuid {
    state
        .repo
        .create_user(NewUser {
            username: "reader".to_string(),
            email: "reader@example.org".to_string(),
            password_hash: "hash".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
}

fn with_user_header(parts: &mut Parts, user_id: Uuid) {
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let state = create_app_state(Env::Production);
    let user_id = seed_user(&state).await;

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &create_token(user_id, 3600, TEST_JWT_SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.roles, vec![ROLE_USER.to_string()]);
    assert!(!user.is_admin());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let state = create_app_state(Env::Production);
    let user_id = seed_user(&state).await;

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    // Well past the default 60 second leeway.
    with_bearer(&mut parts, &create_token(user_id, -3600, TEST_JWT_SECRET));

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let state = create_app_state(Env::Production);
    let user_id = seed_user(&state).await;

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &create_token(user_id, 3600, "some-other-secret"));

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_auth_failure_for_deleted_user() {
    let state = create_app_state(Env::Production);
    let user_id = seed_user(&state).await;
    let token = create_token(user_id, 3600, TEST_JWT_SECRET);
    state.repo.delete_user(user_id).await.unwrap();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_local_bypass_success() {
    let state = create_app_state(Env::Local);
    let user_id = seed_user(&state).await;

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_user_header(&mut parts, user_id);

    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, user_id);
}

#[tokio::test]
async fn test_local_bypass_with_unknown_user_falls_back_to_jwt() {
    let state = create_app_state(Env::Local);

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_user_header(&mut parts, Uuid::new_v4());

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = create_app_state(Env::Production);
    let user_id = seed_user(&state).await;

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    // Only the bypass header, no token.
    with_user_header(&mut parts, user_id);

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}
