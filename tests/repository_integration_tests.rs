//! Runs the `Repository` contract against a real Postgres.
//!
//! Requires `DATABASE_URL`; run with `cargo test -- --ignored`. Every test creates its own
//! uniquely named rows, so the suite can share a database with other runs.

use refarch_cms::{
    ApiError,
    models::{
        ArticleFields, ArticleMeta, CommentTarget, Language, LanguageRequest, LinkFields,
        LinkScope, NewUser, SettingsChanges, UserResponse, role::ROLE_USER,
    },
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn create_language(repo: &PostgresRepository) -> Language {
    repo.create_language(LanguageRequest {
        name: unique("Language"),
        abbreviation: unique("L"),
        font_awesome_icon: "fa-flag".to_string(),
        mdi_icon: "mdi-flag".to_string(),
    })
    .await
    .expect("Failed to create language")
}

async fn create_user(repo: &PostgresRepository) -> UserResponse {
    let username = unique("user");
    repo.create_user(NewUser {
        email: format!("{username}@example.org"),
        username,
        password_hash: "hash".to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to create user")
}

fn article(title: &str) -> ArticleFields {
    ArticleFields {
        title: title.to_string(),
        content: "Body".to_string(),
        ..Default::default()
    }
}

fn page(comments_enabled: bool, published: bool) -> ArticleMeta {
    ArticleMeta {
        link_id: None,
        thumbnail: None,
        comments_enabled,
        published,
    }
}

fn settings(website_name: &str) -> SettingsChanges {
    SettingsChanges {
        session_duration_minutes: 60,
        logo_url: None,
        website_name: website_name.to_string(),
        global_comments_enabled: true,
        maintenance_mode: false,
        max_upload_size_mb: 10,
        default_language: "en".to_string(),
        analytics_tracking_id: None,
        contact_email: Some("admin@example.org".to_string()),
        meta_description: None,
        max_items_per_page: 20,
        sso_auth_enabled: false,
        password_auth_enabled: true,
    }
}

// --- Tests ---

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_page_content_one_per_language() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let language = create_language(&repo).await;
    let page = repo.create_page(page(true, false)).await.unwrap();

    let first = repo
        .attach_page_content(page.id, language.id, article("First"))
        .await
        .unwrap();
    assert_eq!(first.page_id, page.id);

    let duplicate = repo
        .attach_page_content(page.id, language.id, article("Second"))
        .await;
    match duplicate {
        Err(ApiError::Conflict(message)) => assert!(message.contains(&language.abbreviation)),
        other => panic!("expected Conflict, got {other:?}"),
    }

    let aggregate = repo.get_page(page.id).await.unwrap();
    assert_eq!(aggregate.contents, vec![first]);
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_attach_for_same_language_admits_one() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let language = create_language(&repo).await;
    let page = repo.create_page(page(true, true)).await.unwrap();

    let (a, b) = tokio::join!(
        repo.attach_page_content(page.id, language.id, article("A")),
        repo.attach_page_content(page.id, language.id, article("B")),
    );
    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one concurrent attach must win"
    );
    assert_eq!(repo.list_page_contents(page.id).await.unwrap().len(), 1);
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_content_advances_timestamp() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let language = create_language(&repo).await;
    let page = repo.create_page(page(true, true)).await.unwrap();
    let original = repo
        .attach_page_content(page.id, language.id, article("Before"))
        .await
        .unwrap();

    let updated = repo
        .update_page_content(page.id, language.id, article("After"))
        .await
        .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.title, "After");
    assert!(updated.updated_at > original.updated_at);

    repo.remove_page_content(page.id, language.id).await.unwrap();
    let again = repo.remove_page_content(page.id, language.id).await;
    assert!(matches!(again, Err(ApiError::NotFound(_))));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_published_filter() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let draft = repo.create_page(page(true, false)).await.unwrap();

    let public = repo.list_pages(true).await.unwrap();
    assert!(public.iter().all(|p| p.id != draft.id));

    repo.set_page_published(draft.id, true).await.unwrap();
    let public = repo.list_pages(true).await.unwrap();
    assert!(public.iter().any(|p| p.id == draft.id));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_comments_respect_target_flag_and_owner() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_user(&repo).await;
    let closed = repo.create_page(page(false, true)).await.unwrap();
    let open = repo.create_page(page(true, true)).await.unwrap();

    let refused = repo
        .create_comment(author.id, CommentTarget::Page(closed.id), "Hi".to_string())
        .await;
    assert!(matches!(refused, Err(ApiError::Forbidden(_))));

    let comment = repo
        .create_comment(author.id, CommentTarget::Page(open.id), "Hi".to_string())
        .await
        .unwrap();
    assert_eq!(comment.author.username, author.username);
    assert_eq!(comment.target, CommentTarget::Page(open.id));

    let stranger = repo.delete_comment(comment.id, Some(Uuid::new_v4())).await;
    assert!(matches!(stranger, Err(ApiError::NotFound(_))));

    repo.delete_comment(comment.id, Some(author.id)).await.unwrap();
    assert!(repo.list_comments(CommentTarget::Page(open.id)).await.unwrap().is_empty());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_roles_and_uniqueness() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_user(&repo).await;
    assert_eq!(user.roles, vec![ROLE_USER.to_string()]);

    let duplicate = repo
        .create_user(NewUser {
            username: user.username.clone(),
            email: format!("{}@elsewhere.org", unique("x")),
            password_hash: "hash".to_string(),
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate, Err(ApiError::Conflict(_))));

    assert!(repo.count_users().await.unwrap() >= 1);
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_link_clears_references_and_language_in_use_is_kept() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let link = repo
        .create_link(LinkFields::new(format!("/{}", unique("path")), LinkScope::Internal))
        .await
        .unwrap();
    let created = repo
        .create_page(ArticleMeta {
            link_id: Some(link.id),
            ..page(true, true)
        })
        .await
        .unwrap();

    repo.delete_link(link.id).await.unwrap();
    assert_eq!(repo.get_page(created.id).await.unwrap().link_id, None);

    let language = create_language(&repo).await;
    repo.attach_page_content(created.id, language.id, article("Kept"))
        .await
        .unwrap();
    let in_use = repo.delete_language(language.id).await;
    assert!(matches!(in_use, Err(ApiError::Conflict(_))));

    repo.delete_page(created.id).await.unwrap();
    repo.delete_language(language.id).await.unwrap();
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_page_authors_are_idempotent_and_follow_user_deletion() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_user(&repo).await;
    let draft = repo.create_page(page(true, false)).await.unwrap();

    let authors = repo.assign_page_author(draft.id, user.id).await.unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].username, user.username);
    let again = repo.assign_page_author(draft.id, user.id).await.unwrap();
    assert_eq!(again, authors);

    let unknown = repo.assign_page_author(draft.id, Uuid::new_v4()).await;
    assert!(matches!(unknown, Err(ApiError::NotFound(_))));

    assert!(repo.list_pages_by_author(user.id, true).await.unwrap().is_empty());
    let all = repo.list_pages_by_author(user.id, false).await.unwrap();
    assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![draft.id]);

    repo.delete_user(user.id).await.unwrap();
    assert!(repo.list_page_authors(draft.id).await.unwrap().is_empty());
    let gone = repo.remove_page_author(draft.id, user.id).await;
    assert!(matches!(gone, Err(ApiError::NotFound(_))));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_settings_upsert_keeps_the_singleton_row() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let first = repo.save_settings(settings(&unique("Site"))).await.unwrap();
    let name = unique("Renamed");
    let second = repo.save_settings(settings(&name)).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.website_name, name);
    assert_eq!(repo.get_settings().await.unwrap(), second);
}
