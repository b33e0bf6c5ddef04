use axum::{
    Json,
    body::Body,
    extract::{FromRequest, Path, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
};
use refarch_cms::{
    ApiError, AppState, InMemoryRepository,
    auth::AuthUser,
    config::AppConfig,
    extract::ValidatedJson,
    handlers::{comments, homepages, languages, links, pages, posts, settings, users},
    models::{
        Language, LanguageRequest, LinkFields, LinkScope, NewUser,
        role::{ROLE_ADMIN, ROLE_USER},
    },
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;
use validator::Validate;

// --- Fixtures ---

fn create_test_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()),
        config: AppConfig::default(),
    }
}

/// Runs `value` through the same extractor the router uses, validation included.
async fn try_payload<T>(value: Value) -> Result<ValidatedJson<T>, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap();
    ValidatedJson::from_request(request, &()).await
}

async fn payload<T>(value: Value) -> ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
{
    match try_payload(value).await {
        Ok(extracted) => extracted,
        Err(err) => panic!("fixture payload rejected: {err:?}"),
    }
}

async fn seed_user(state: &AppState, username: &str, admin: bool) -> AuthUser {
    let user = state
        .repo
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@example.org"),
            password_hash: "not-a-real-hash".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let user = if admin {
        let role = state.repo.get_role_by_name(ROLE_ADMIN).await.unwrap();
        state.repo.assign_role(user.id, role.id).await.unwrap()
    } else {
        user
    };
    AuthUser {
        id: user.id,
        roles: user.roles,
    }
}

async fn seed_language(state: &AppState, abbreviation: &str) -> Language {
    state
        .repo
        .create_language(LanguageRequest {
            name: format!("Language {abbreviation}"),
            abbreviation: abbreviation.to_string(),
            font_awesome_icon: "fa-flag".to_string(),
            mdi_icon: "mdi-flag".to_string(),
        })
        .await
        .unwrap()
}

fn page_body(comments_enabled: bool, published: bool) -> Value {
    json!({ "commentsEnabled": comments_enabled, "published": published })
}

fn article(language_id: Uuid, title: &str) -> Value {
    json!({ "languageId": language_id, "title": title, "content": "World" })
}

fn settings_body(global_comments_enabled: bool) -> Value {
    json!({
        "sessionDurationMinutes": 60,
        "websiteName": "Arena",
        "globalCommentsEnabled": global_comments_enabled,
        "maintenanceMode": false,
        "maxUploadSizeMb": 10,
        "defaultLanguage": "en",
        "maxItemsPerPage": 20,
        "ssoAuthEnabled": false,
        "passwordAuthEnabled": true
    })
}

async fn create_page(state: &AppState, admin: &AuthUser, comments: bool, published: bool) -> Uuid {
    let (status, Json(page)) = pages::create_page(
        admin.clone(),
        State(state.clone()),
        payload(page_body(comments, published)).await,
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    page.id
}

// --- Localized content ---

#[test]
async fn test_attach_page_content_then_duplicate_is_conflict_naming_language() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let en = seed_language(&state, "EN").await;
    let page_id = create_page(&state, &admin, true, false).await;

    let (status, Json(content)) = pages::attach_page_content(
        admin.clone(),
        State(state.clone()),
        Path(page_id),
        payload(article(en.id, "Hello")).await,
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(content.page_id, page_id);
    assert_eq!(content.language_id, en.id);
    assert_eq!(content.title, "Hello");
    assert_eq!(content.created_at, content.updated_at);

    let duplicate = pages::attach_page_content(
        admin.clone(),
        State(state.clone()),
        Path(page_id),
        payload(article(en.id, "Hello again")).await,
    )
    .await;
    match duplicate {
        Err(ApiError::Conflict(message)) => {
            assert!(message.contains("EN"), "message should name the language: {message}");
            assert!(message.contains(&en.id.to_string()));
        }
        other => panic!("expected Conflict, got {other:?}"),
    }

    let Json(page) = pages::admin_get_page(admin, State(state), Path(page_id))
        .await
        .unwrap();
    assert_eq!(page.contents.len(), 1);
    assert_eq!(page.contents[0].title, "Hello");
}

#[test]
async fn test_attach_payload_without_language_is_rejected_by_the_extractor() {
    let rejected = try_payload::<refarch_cms::models::CreateArticleContentRequest>(
        json!({ "title": "Hello", "content": "World" }),
    )
    .await;
    match rejected {
        Err(ApiError::Validation(fields)) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "languageId");
            assert_eq!(fields[0].message, "Language ID is required");
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    let blank = try_payload::<refarch_cms::models::CreateArticleContentRequest>(
        json!({ "languageId": Uuid::new_v4(), "title": "  ", "content": "World" }),
    )
    .await;
    match blank {
        Err(ApiError::Validation(fields)) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "title");
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    let malformed = try_payload::<refarch_cms::models::PageRequest>(json!({ "published": "yes" })).await;
    assert!(matches!(malformed, Err(ApiError::BadRequest(_))));
}

#[test]
async fn test_attach_to_unknown_language_or_page_is_not_found() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let en = seed_language(&state, "EN").await;
    let page_id = create_page(&state, &admin, true, true).await;

    let unknown_language = pages::attach_page_content(
        admin.clone(),
        State(state.clone()),
        Path(page_id),
        payload(article(Uuid::new_v4(), "Hello")).await,
    )
    .await;
    assert!(matches!(unknown_language, Err(ApiError::NotFound(_))));

    let unknown_page = pages::attach_page_content(
        admin,
        State(state),
        Path(Uuid::new_v4()),
        payload(article(en.id, "Hello")).await,
    )
    .await;
    assert!(matches!(unknown_page, Err(ApiError::NotFound(_))));
}

#[test]
async fn test_update_post_content_keeps_keys_and_advances_timestamp() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let en = seed_language(&state, "EN").await;
    let link = state
        .repo
        .create_link(LinkFields::new("/blog/hello", LinkScope::Internal))
        .await
        .unwrap();
    let (_, Json(post)) = posts::create_post(
        admin.clone(),
        State(state.clone()),
        payload(json!({ "linkId": link.id, "commentsEnabled": true, "published": true })).await,
    )
    .await
    .unwrap();
    assert_eq!(post.link_id, Some(link.id));

    let (_, Json(original)) = posts::attach_post_content(
        admin.clone(),
        State(state.clone()),
        Path(post.id),
        payload(article(en.id, "Draft title")).await,
    )
    .await
    .unwrap();

    let Json(updated) = posts::update_post_content(
        admin.clone(),
        State(state.clone()),
        Path((post.id, en.id)),
        payload(json!({ "title": "Final title", "content": "Final body" })).await,
    )
    .await
    .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.post_id, post.id);
    assert_eq!(updated.language_id, en.id);
    assert_eq!(updated.title, "Final title");
    assert!(updated.updated_at > original.updated_at);
    assert_eq!(updated.created_at, original.created_at);
}

#[test]
async fn test_post_without_link_is_rejected() {
    let rejected = try_payload::<refarch_cms::models::PostRequest>(
        json!({ "commentsEnabled": true, "published": true }),
    )
    .await;
    match rejected {
        Err(ApiError::Validation(fields)) => assert_eq!(fields[0].field, "linkId"),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
async fn test_update_cannot_change_language() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let en = seed_language(&state, "EN").await;
    let de = seed_language(&state, "DE").await;
    let page_id = create_page(&state, &admin, true, true).await;
    let _ = pages::attach_page_content(
        admin.clone(),
        State(state.clone()),
        Path(page_id),
        payload(article(en.id, "Hello")).await,
    )
    .await
    .unwrap();

    let result = pages::update_page_content(
        admin,
        State(state),
        Path((page_id, en.id)),
        payload(article(de.id, "Hallo")).await,
    )
    .await;
    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[test]
async fn test_remove_content_twice_is_not_found_and_response_reflects_removal() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let en = seed_language(&state, "EN").await;
    let de = seed_language(&state, "DE").await;
    let fr = seed_language(&state, "FR").await;
    let page_id = create_page(&state, &admin, true, true).await;

    for language in [&en, &de, &fr] {
        let _ = pages::attach_page_content(
            admin.clone(),
            State(state.clone()),
            Path(page_id),
            payload(article(language.id, &language.abbreviation)).await,
        )
        .await
        .unwrap();
    }

    let status = pages::remove_page_content(admin.clone(), State(state.clone()), Path((page_id, de.id)))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let again = pages::remove_page_content(admin.clone(), State(state.clone()), Path((page_id, de.id))).await;
    assert!(matches!(again, Err(ApiError::NotFound(_))));

    let Json(page) = pages::get_page(State(state), Path(page_id)).await.unwrap();
    let mut languages: Vec<Uuid> = page.contents.iter().map(|c| c.language_id).collect();
    languages.sort();
    let mut expected = vec![en.id, fr.id];
    expected.sort();
    assert_eq!(languages, expected);
}

#[test]
async fn test_homepage_content_requires_welcome_message_language() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let en = seed_language(&state, "EN").await;
    let (_, Json(homepage)) = homepages::create_homepage(
        admin.clone(),
        State(state.clone()),
        payload(json!({})).await,
    )
    .await
    .unwrap();

    let missing_message = try_payload::<refarch_cms::models::CreateHomepageContentRequest>(
        json!({ "languageId": en.id }),
    )
    .await;
    match missing_message {
        Err(ApiError::Validation(fields)) => assert_eq!(fields[0].field, "welcomeMessage"),
        other => panic!("expected Validation, got {other:?}"),
    }

    let (_, Json(content)) = homepages::attach_homepage_content(
        admin.clone(),
        State(state.clone()),
        Path(homepage.id),
        payload(json!({ "languageId": en.id, "welcomeMessage": "Welcome", "blog": "Latest posts" })).await,
    )
    .await
    .unwrap();
    assert_eq!(content.homepage_id, homepage.id);

    let Json(contents) = homepages::list_homepage_contents(State(state.clone()), Path(homepage.id))
        .await
        .unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].blog.as_deref(), Some("Latest posts"));

    let Json(single) = homepages::get_homepage_content(State(state), Path((homepage.id, en.id)))
        .await
        .unwrap();
    assert_eq!(single.welcome_message, "Welcome");
}

// --- Visibility ---

#[test]
async fn test_unpublished_page_is_hidden_from_public_routes() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let draft = create_page(&state, &admin, true, false).await;
    let live = create_page(&state, &admin, true, true).await;

    let Json(public) = pages::list_pages(State(state.clone())).await.unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].id, live);

    let hidden = pages::get_page(State(state.clone()), Path(draft)).await;
    assert!(matches!(hidden, Err(ApiError::NotFound(_))));

    let Json(all) = pages::admin_list_pages(admin.clone(), State(state.clone()))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let Json(published) = pages::publish_page(admin, State(state.clone()), Path(draft)).await.unwrap();
    assert!(published.published);
    assert!(pages::get_page(State(state), Path(draft)).await.is_ok());
}

#[test]
async fn test_admin_routes_reject_regular_users() {
    let state = create_test_state();
    let user = seed_user(&state, "reader", false).await;

    let result = pages::create_page(user.clone(), State(state.clone()), payload(page_body(true, true)).await).await;
    assert!(matches!(result, Err(ApiError::Forbidden(_))));

    let result = settings::update_settings(user.clone(), State(state.clone()), payload(settings_body(true)).await).await;
    assert!(matches!(result, Err(ApiError::Forbidden(_))));

    let result = users::list_users(user, State(state)).await;
    assert!(matches!(result, Err(ApiError::Forbidden(_))));
}

// --- Authors ---

#[test]
async fn test_post_authors_are_listed_publicly_once_published() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let writer = seed_user(&state, "writer", false).await;
    let editor = seed_user(&state, "editor", false).await;
    let link = state
        .repo
        .create_link(LinkFields::new("/blog/team", LinkScope::Internal))
        .await
        .unwrap();
    let (_, Json(post)) = posts::create_post(
        admin.clone(),
        State(state.clone()),
        payload(json!({ "linkId": link.id, "commentsEnabled": true, "published": false })).await,
    )
    .await
    .unwrap();

    let _ = posts::assign_post_author(admin.clone(), State(state.clone()), Path((post.id, writer.id)))
        .await
        .unwrap();
    let Json(authors) = posts::assign_post_author(admin.clone(), State(state.clone()), Path((post.id, editor.id)))
        .await
        .unwrap();
    let names: Vec<&str> = authors.iter().map(|a| a.username.as_str()).collect();
    assert_eq!(names, vec!["editor", "writer"]);

    // Assigning twice changes nothing.
    let Json(again) = posts::assign_post_author(admin.clone(), State(state.clone()), Path((post.id, writer.id)))
        .await
        .unwrap();
    assert_eq!(again, authors);

    let hidden = posts::list_post_authors(State(state.clone()), Path(post.id)).await;
    assert!(matches!(hidden, Err(ApiError::NotFound(_))));
    let Json(admin_view) = posts::admin_list_post_authors(admin.clone(), State(state.clone()), Path(post.id))
        .await
        .unwrap();
    assert_eq!(admin_view, authors);
    let Json(drafts) = posts::list_user_posts(State(state.clone()), Path(writer.id)).await.unwrap();
    assert!(drafts.is_empty());

    let Json(_) = posts::publish_post(admin.clone(), State(state.clone()), Path(post.id))
        .await
        .unwrap();
    let Json(public) = posts::list_post_authors(State(state.clone()), Path(post.id)).await.unwrap();
    assert_eq!(public, authors);
    let Json(written) = posts::list_user_posts(State(state.clone()), Path(writer.id)).await.unwrap();
    assert_eq!(written.len(), 1);

    let status = posts::remove_post_author(admin.clone(), State(state.clone()), Path((post.id, writer.id)))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    let Json(remaining) = posts::list_post_authors(State(state.clone()), Path(post.id)).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, editor.id);

    let unknown_user = posts::assign_post_author(admin, State(state), Path((post.id, Uuid::new_v4()))).await;
    assert!(matches!(unknown_user, Err(ApiError::NotFound(_))));
}

#[test]
async fn test_deleting_a_user_drops_their_page_credits() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let writer = seed_user(&state, "writer", false).await;
    let page_id = create_page(&state, &admin, true, true).await;

    let _ = pages::assign_page_author(admin.clone(), State(state.clone()), Path((page_id, writer.id)))
        .await
        .unwrap();
    let status = users::delete_user(admin.clone(), State(state.clone()), Path(writer.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let Json(authors) = pages::admin_list_page_authors(admin, State(state), Path(page_id))
        .await
        .unwrap();
    assert!(authors.is_empty());
}

// --- Settings ---

#[test]
async fn test_settings_are_missing_until_saved_then_upserted() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;

    let missing = settings::get_settings(State(state.clone())).await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));

    let Json(first) = settings::update_settings(admin.clone(), State(state.clone()), payload(settings_body(true)).await)
        .await
        .unwrap();
    assert!(first.global_comments_enabled);
    assert_eq!(first.max_items_per_page, 20);

    let Json(second) = settings::update_settings(admin, State(state.clone()), payload(settings_body(false)).await)
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(!second.global_comments_enabled);

    let Json(current) = settings::get_settings(State(state)).await.unwrap();
    assert_eq!(current, second);
}

#[test]
async fn test_non_positive_settings_are_rejected() {
    let mut body = settings_body(true);
    body["maxItemsPerPage"] = json!(0);
    let rejected = try_payload::<refarch_cms::models::GlobalSettingsRequest>(body).await;
    match rejected {
        Err(ApiError::Validation(fields)) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "maxItemsPerPage");
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

// --- Comments ---

#[test]
async fn test_comment_with_both_or_neither_target_is_conflict() {
    let state = create_test_state();
    let user = seed_user(&state, "reader", false).await;

    let both = comments::create_comment(
        user.clone(),
        State(state.clone()),
        payload(json!({ "content": "Nice", "postId": Uuid::new_v4(), "pageId": Uuid::new_v4() })).await,
    )
    .await;
    assert!(matches!(both, Err(ApiError::Conflict(_))));

    let neither = comments::create_comment(user, State(state), payload(json!({ "content": "Nice" })).await).await;
    assert!(matches!(neither, Err(ApiError::Conflict(_))));
}

#[test]
async fn test_comment_on_page_with_comments_disabled_is_forbidden() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let user = seed_user(&state, "reader", false).await;
    let page_id = create_page(&state, &admin, false, true).await;

    let result = comments::create_comment(
        user,
        State(state),
        payload(json!({ "content": "Hello", "pageId": page_id })).await,
    )
    .await;
    assert!(matches!(result, Err(ApiError::Forbidden(_))));
}

#[test]
async fn test_global_switch_closes_pages_that_allow_comments() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let user = seed_user(&state, "reader", false).await;
    let page_id = create_page(&state, &admin, true, true).await;

    let Json(_) = settings::update_settings(admin.clone(), State(state.clone()), payload(settings_body(false)).await)
        .await
        .unwrap();
    let refused = comments::create_comment(
        user.clone(),
        State(state.clone()),
        payload(json!({ "content": "Hello", "pageId": page_id })).await,
    )
    .await;
    match refused {
        Err(ApiError::Forbidden(message)) => assert!(message.contains("site-wide")),
        other => panic!("expected Forbidden, got {other:?}"),
    }

    let Json(_) = settings::update_settings(admin, State(state.clone()), payload(settings_body(true)).await)
        .await
        .unwrap();
    let (status, _) = comments::create_comment(
        user,
        State(state),
        payload(json!({ "content": "Hello", "pageId": page_id })).await,
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
}

#[test]
async fn test_comment_lifecycle_owner_only() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let author = seed_user(&state, "author", false).await;
    let stranger = seed_user(&state, "stranger", false).await;
    let page_id = create_page(&state, &admin, true, true).await;

    let (status, Json(comment)) = comments::create_comment(
        author.clone(),
        State(state.clone()),
        payload(json!({ "content": "First!", "pageId": page_id })).await,
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment.author.username, "author");
    assert_eq!(comment.author.id, author.id);

    let Json(listed) = comments::list_page_comments(State(state.clone()), Path(page_id))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let foreign_edit = comments::update_comment(
        stranger.clone(),
        State(state.clone()),
        Path(comment.id),
        payload(json!({ "content": "Hijacked" })).await,
    )
    .await;
    assert!(matches!(foreign_edit, Err(ApiError::NotFound(_))));

    let foreign_delete = comments::delete_comment(stranger, State(state.clone()), Path(comment.id)).await;
    assert!(matches!(foreign_delete, Err(ApiError::NotFound(_))));

    let Json(edited) = comments::update_comment(
        author.clone(),
        State(state.clone()),
        Path(comment.id),
        payload(json!({ "content": "Edited" })).await,
    )
    .await
    .unwrap();
    assert_eq!(edited.content, "Edited");

    let Json(mine) = comments::get_my_comments(author, State(state.clone())).await.unwrap();
    assert_eq!(mine.len(), 1);

    let status = comments::delete_comment(admin, State(state.clone()), Path(comment.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[test]
async fn test_deleting_page_removes_its_comments() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let author = seed_user(&state, "author", false).await;
    let page_id = create_page(&state, &admin, true, true).await;
    let _ = comments::create_comment(
        author.clone(),
        State(state.clone()),
        payload(json!({ "content": "Bye", "pageId": page_id })).await,
    )
    .await
    .unwrap();

    let _ = pages::delete_page(admin, State(state.clone()), Path(page_id)).await.unwrap();

    let Json(mine) = comments::get_my_comments(author, State(state)).await.unwrap();
    assert!(mine.is_empty());
}

// --- Reference data ---

#[test]
async fn test_duplicate_language_abbreviation_is_conflict() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    seed_language(&state, "EN").await;

    let result = languages::create_language(
        admin,
        State(state),
        payload(json!({
            "name": "English (again)", "abbreviation": "EN", "fontAwesomeIcon": "fa-flag", "mdiIcon": "mdi-flag"
        }))
        .await,
    )
    .await;
    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[test]
async fn test_language_in_use_cannot_be_deleted() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let en = seed_language(&state, "EN").await;
    let page_id = create_page(&state, &admin, true, true).await;
    let _ = pages::attach_page_content(
        admin.clone(),
        State(state.clone()),
        Path(page_id),
        payload(article(en.id, "Hello")).await,
    )
    .await
    .unwrap();

    let result = languages::delete_language(admin, State(state), Path(en.id)).await;
    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[test]
async fn test_internal_links_filter_and_delete_clears_references() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;

    let (_, Json(internal)) = links::create_link(
        admin.clone(),
        State(state.clone()),
        payload(json!({ "url": "/about", "scope": "INTERNAL" })).await,
    )
    .await
    .unwrap();
    let (_, Json(external)) = links::create_link(
        admin.clone(),
        State(state.clone()),
        payload(json!({ "url": "https://example.org", "scope": "EXTERNAL" })).await,
    )
    .await
    .unwrap();
    assert_eq!(external.scope, LinkScope::External);

    let Json(all) = links::list_links(State(state.clone())).await.unwrap();
    assert_eq!(all.len(), 2);
    let Json(only_internal) = links::list_internal_links(State(state.clone())).await.unwrap();
    assert_eq!(only_internal.len(), 1);
    assert_eq!(only_internal[0].id, internal.id);

    let (_, Json(page)) = pages::create_page(
        admin.clone(),
        State(state.clone()),
        payload(json!({ "linkId": internal.id, "commentsEnabled": true, "published": true })).await,
    )
    .await
    .unwrap();

    let _ = links::delete_link(admin, State(state.clone()), Path(internal.id))
        .await
        .unwrap();

    let Json(page) = pages::get_page(State(state), Path(page.id)).await.unwrap();
    assert_eq!(page.link_id, None);
}

// --- Users and bios ---

#[test]
async fn test_register_user_hashes_and_assigns_default_role() {
    let state = create_test_state();

    let (status, Json(user)) = users::register_user(
        State(state.clone()),
        payload(json!({ "username": "alice", "email": "alice@example.org", "password": "s3cret" })).await,
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user.roles, vec![ROLE_USER.to_string()]);

    let duplicate = users::register_user(
        State(state),
        payload(json!({ "username": "alice", "email": "other@example.org", "password": "s3cret" })).await,
    )
    .await;
    assert!(matches!(duplicate, Err(ApiError::Conflict(_))));
}

#[test]
async fn test_admin_partial_update_keeps_omitted_fields() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin", true).await;
    let user = seed_user(&state, "bob", false).await;

    let Json(updated) = users::update_user(
        admin,
        State(state),
        Path(user.id),
        payload(json!({ "firstName": "Bob", "password": "new-password" })).await,
    )
    .await
    .unwrap();

    assert_eq!(updated.username, "bob");
    assert_eq!(updated.first_name.as_deref(), Some("Bob"));
}

#[test]
async fn test_bio_per_language_is_unique() {
    let state = create_test_state();
    let user = seed_user(&state, "writer", false).await;
    let en = seed_language(&state, "EN").await;

    let (status, Json(bio)) = users::create_my_bio(
        user.clone(),
        State(state.clone()),
        payload(json!({ "languageId": en.id, "bio": "I write things." })).await,
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bio.user_id, user.id);

    let duplicate = users::create_my_bio(
        user.clone(),
        State(state.clone()),
        payload(json!({ "languageId": en.id, "bio": "Again." })).await,
    )
    .await;
    assert!(matches!(duplicate, Err(ApiError::Conflict(_))));

    let Json(bios) = users::list_user_bios(State(state.clone()), Path(user.id))
        .await
        .unwrap();
    assert_eq!(bios.len(), 1);

    let status = users::delete_my_bio(user.clone(), State(state.clone()), Path(en.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let missing = users::get_user_bio(State(state), Path((user.id, en.id))).await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}
