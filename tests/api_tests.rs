use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use refarch_cms::{
    AppConfig, AppState, InMemoryRepository, create_router,
    error::ErrorResponse,
    models::{
        Author, Comment, GlobalSettings, Language, Link, LinkFields, LinkScope, NewUser,
        PageContent, PageResponse, role::ROLE_ADMIN,
    },
    repository::RepositoryState,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub repo: RepositoryState,
}

/// Serves the full router on a random port, backed by a fresh in-memory repository.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let state = AppState {
        repo: repo.clone(),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, repo }
}

impl TestApp {
    async fn seed_user(&self, username: &str, admin: bool) -> Uuid {
        let user = self
            .repo
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.org"),
                password_hash: "hash".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        if admin {
            let role = self.repo.get_role_by_name(ROLE_ADMIN).await.unwrap();
            self.repo.assign_role(user.id, role.id).await.unwrap();
        }
        user.id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::get(app.url("/health")).await.expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = reqwest::get(app.url("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), 200);
    let doc: serde_json::Value = response.json().await.unwrap();
    assert!(doc["paths"]["/admin/pages/{id}/content"].is_object());
}

#[tokio::test]
async fn test_page_content_lifecycle_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.seed_user("admin", true).await.to_string();

    // Language
    let resp = client
        .post(app.url("/admin/languages"))
        .header("x-user-id", &admin)
        .json(&json!({
            "name": "English", "abbreviation": "EN", "fontAwesomeIcon": "fa-flag", "mdiIcon": "mdi-flag"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let en: Language = resp.json().await.unwrap();

    // Draft page
    let resp = client
        .post(app.url("/admin/pages"))
        .header("x-user-id", &admin)
        .json(&json!({ "commentsEnabled": true, "published": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let page: PageResponse = resp.json().await.unwrap();

    // Content
    let resp = client
        .post(app.url(&format!("/admin/pages/{}/content", page.id)))
        .header("x-user-id", &admin)
        .json(&json!({ "languageId": en.id, "title": "Hello", "content": "World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let content: PageContent = resp.json().await.unwrap();
    assert_eq!(content.language_id, en.id);

    // Same language again
    let resp = client
        .post(app.url(&format!("/admin/pages/{}/content", page.id)))
        .header("x-user-id", &admin)
        .json(&json!({ "languageId": en.id, "title": "Again", "content": "World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let error: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(error.error, "conflict");
    assert!(error.message.contains("EN"));

    // Drafts are invisible publicly
    let resp = client.get(app.url(&format!("/pages/{}", page.id))).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .put(app.url(&format!("/admin/pages/{}/publish", page.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(app.url(&format!("/pages/{}/content/{}", page.id, en.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: PageContent = resp.json().await.unwrap();
    assert_eq!(fetched.title, "Hello");
}

#[tokio::test]
async fn test_validation_errors_name_fields() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.seed_user("admin", true).await.to_string();

    let resp = client
        .post(app.url("/admin/links"))
        .header("x-user-id", &admin)
        .json(&json!({ "link": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let error: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(error.error, "validation_error");
    let fields: Vec<&str> = error.fields.iter().map(|f| f.field.as_str()).collect();
    assert_eq!(fields, vec!["scope", "url"]);
}

#[tokio::test]
async fn test_link_accepts_link_alias_and_type_key() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.seed_user("admin", true).await.to_string();

    let resp = client
        .post(app.url("/admin/links"))
        .header("x-user-id", &admin)
        .json(&json!({ "link": "/about", "type": "menu", "scope": "INTERNAL" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let link: Link = resp.json().await.unwrap();
    assert_eq!(link.url, "/about");
    assert_eq!(link.link_type.as_deref(), Some("menu"));

    let internal: Vec<Link> = client
        .get(app.url("/links/internal"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(internal.len(), 1);
}

#[tokio::test]
async fn test_access_control() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let reader = app.seed_user("reader", false).await.to_string();

    // No identity at all
    let resp = client.get(app.url("/me")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let resp = client.get(app.url("/admin/pages")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    // Signed in, but not an administrator
    let resp = client
        .get(app.url("/admin/pages"))
        .header("x-user-id", &reader)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(app.url("/me"))
        .header("x-user-id", &reader)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_comment_flow_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.seed_user("admin", true).await.to_string();
    let reader = app.seed_user("reader", false).await.to_string();
    let link = app
        .repo
        .create_link(LinkFields::new("/blog/first", LinkScope::Internal))
        .await
        .unwrap();

    let post: serde_json::Value = client
        .post(app.url("/admin/posts"))
        .header("x-user-id", &admin)
        .json(&json!({ "linkId": link.id, "commentsEnabled": true, "published": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let post_id = post["id"].as_str().unwrap().to_string();

    let resp = client
        .post(app.url("/comments"))
        .header("x-user-id", &reader)
        .json(&json!({ "content": "Great read", "postId": post_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let comment: Comment = resp.json().await.unwrap();
    assert_eq!(comment.author.username, "reader");

    let listed: Vec<Comment> = client
        .get(app.url(&format!("/posts/{post_id}/comments")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed, vec![comment.clone()]);

    // Someone else cannot delete it; an administrator can.
    let resp = client
        .delete(app.url(&format!("/comments/{}", comment.id)))
        .header("x-user-id", app.seed_user("other", false).await.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .delete(app.url(&format!("/comments/{}", comment.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn test_blank_comment_is_rejected_before_the_handler() {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let reader = repo
        .create_user(NewUser {
            username: "reader".to_string(),
            email: "reader@example.org".to_string(),
            password_hash: "hash".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let app = create_router(AppState {
        repo,
        config: AppConfig::default(),
    });

    let request = Request::builder()
        .method("POST")
        .uri("/comments")
        .header("content-type", "application/json")
        .header("x-user-id", reader.id.to_string())
        .body(Body::from(
            json!({ "content": "", "pageId": Uuid::new_v4() }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.fields.len(), 1);
    assert_eq!(error.fields[0].field, "content");
    assert_eq!(error.fields[0].message, "Comment content is required");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.seed_user("admin", true).await.to_string();

    let resp = client
        .post(app.url("/admin/roles"))
        .header("x-user-id", &admin)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let error: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(error.error, "bad_request");
}

#[tokio::test]
async fn test_empty_content_payload_names_every_required_field() {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let admin = repo
        .create_user(NewUser {
            username: "admin".to_string(),
            email: "admin@example.org".to_string(),
            password_hash: "hash".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let role = repo.get_role_by_name(ROLE_ADMIN).await.unwrap();
    repo.assign_role(admin.id, role.id).await.unwrap();
    let app = create_router(AppState {
        repo,
        config: AppConfig::default(),
    });

    let request = Request::builder()
        .method("POST")
        .uri(format!("/admin/pages/{}/content", Uuid::new_v4()))
        .header("content-type", "application/json")
        .header("x-user-id", admin.id.to_string())
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    let fields: Vec<&str> = error.fields.iter().map(|f| f.field.as_str()).collect();
    assert_eq!(fields, vec!["content", "languageId", "title"]);
}

fn settings_body(global_comments_enabled: bool) -> serde_json::Value {
    json!({
        "sessionDurationMinutes": 120,
        "websiteName": "Arena",
        "globalCommentsEnabled": global_comments_enabled,
        "maintenanceMode": false,
        "maxUploadSizeMb": 10,
        "defaultLanguage": "en",
        "maxItemsPerPage": 25,
        "ssoAuthEnabled": false,
        "passwordAuthEnabled": true
    })
}

#[tokio::test]
async fn test_settings_flow_and_global_comment_switch() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.seed_user("admin", true).await.to_string();
    let reader = app.seed_user("reader", false).await.to_string();

    let resp = client.get(app.url("/settings")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    // Only administrators may change them.
    let resp = client
        .put(app.url("/admin/settings"))
        .header("x-user-id", &reader)
        .json(&settings_body(true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .put(app.url("/admin/settings"))
        .header("x-user-id", &admin)
        .json(&settings_body(true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let saved: GlobalSettings = resp.json().await.unwrap();
    assert_eq!(saved.website_name, "Arena");

    let fetched: GlobalSettings = client
        .get(app.url("/settings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, saved);

    let page: PageResponse = client
        .post(app.url("/admin/pages"))
        .header("x-user-id", &admin)
        .json(&json!({ "commentsEnabled": true, "published": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = client
        .put(app.url("/admin/settings"))
        .header("x-user-id", &admin)
        .json(&settings_body(false))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let switched: GlobalSettings = resp.json().await.unwrap();
    assert_eq!(switched.id, saved.id);

    let resp = client
        .post(app.url("/comments"))
        .header("x-user-id", &reader)
        .json(&json!({ "content": "Hello", "pageId": page.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let error: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(error.error, "forbidden");
}

#[tokio::test]
async fn test_page_authors_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.seed_user("admin", true).await.to_string();
    let writer = app.seed_user("writer", false).await;

    let page: PageResponse = client
        .post(app.url("/admin/pages"))
        .header("x-user-id", &admin)
        .json(&json!({ "commentsEnabled": false, "published": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = client
        .put(app.url(&format!("/admin/pages/{}/authors/{writer}", page.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let authors: Vec<Author> = resp.json().await.unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].username, "writer");

    // Drafts and their authors stay hidden from the public routes.
    let resp = client
        .get(app.url(&format!("/pages/{}/authors", page.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let listed: Vec<PageResponse> = client
        .get(app.url(&format!("/users/{writer}/pages")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    let resp = client
        .put(app.url(&format!("/admin/pages/{}/publish", page.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let public: Vec<Author> = client
        .get(app.url(&format!("/pages/{}/authors", page.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(public, authors);
    let listed: Vec<PageResponse> = client
        .get(app.url(&format!("/users/{writer}/pages")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, page.id);

    let resp = client
        .delete(app.url(&format!("/admin/pages/{}/authors/{writer}", page.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let resp = client
        .delete(app.url(&format!("/admin/pages/{}/authors/{writer}", page.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
