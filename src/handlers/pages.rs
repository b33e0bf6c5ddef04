use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, AppResult},
    extract::ValidatedJson,
    models::{
        ArticleContentRequest, Author, CreateArticleContentRequest, LanguageScoped, PageContent,
        PageRequest, PageResponse,
    },
    repository::RepositoryState,
};

/// Loads a page for anonymous readers. Drafts are reported as missing.
pub(crate) async fn published_page(repo: &RepositoryState, id: Uuid) -> AppResult<PageResponse> {
    let page = repo.get_page(id).await?;
    if !page.published {
        return Err(ApiError::not_found("Page", id));
    }
    Ok(page)
}

// --- Public ---

/// list_pages
///
/// [Public Route] Lists published pages, newest first, each with all of its language variants.
#[utoipa::path(
    get,
    path = "/pages",
    responses((status = 200, description = "Published pages", body = [PageResponse]))
)]
pub async fn list_pages(State(state): State<AppState>) -> AppResult<Json<Vec<PageResponse>>> {
    Ok(Json(state.repo.list_pages(true).await?))
}

/// get_page
///
/// [Public Route] Retrieves a published page with its full content set.
#[utoipa::path(
    get,
    path = "/pages/{id}",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Page", body = PageResponse),
        (status = 404, description = "Unknown or unpublished page")
    )
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PageResponse>> {
    Ok(Json(published_page(&state.repo, id).await?))
}

/// list_page_contents
///
/// [Public Route] Lists the language variants of a published page.
#[utoipa::path(
    get,
    path = "/pages/{id}/content",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 200, description = "Page contents", body = [PageContent]))
)]
pub async fn list_page_contents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<PageContent>>> {
    let page = published_page(&state.repo, id).await?;
    Ok(Json(page.contents))
}

/// get_page_content
///
/// [Public Route] Retrieves one language variant of a published page.
#[utoipa::path(
    get,
    path = "/pages/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    responses(
        (status = 200, description = "Page content", body = PageContent),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn get_page_content(
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<PageContent>> {
    published_page(&state.repo, id).await?;
    Ok(Json(state.repo.get_page_content(id, language_id).await?))
}

/// list_page_authors
///
/// [Public Route] Lists the users credited on a published page.
#[utoipa::path(
    get,
    path = "/pages/{id}/authors",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Authors", body = [Author]),
        (status = 404, description = "Unknown or unpublished page")
    )
)]
pub async fn list_page_authors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Author>>> {
    published_page(&state.repo, id).await?;
    Ok(Json(state.repo.list_page_authors(id).await?))
}

/// list_user_pages
///
/// [Public Route] Lists the published pages a user is credited on, newest first.
#[utoipa::path(
    get,
    path = "/users/{id}/pages",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Authored pages", body = [PageResponse]),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn list_user_pages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<PageResponse>>> {
    Ok(Json(state.repo.list_pages_by_author(id, true).await?))
}

// --- Admin ---

/// admin_list_pages
///
/// [Admin Route] Lists every page, drafts included.
#[utoipa::path(
    get,
    path = "/admin/pages",
    responses(
        (status = 200, description = "All pages", body = [PageResponse]),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn admin_list_pages(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PageResponse>>> {
    auth.require_admin()?;
    Ok(Json(state.repo.list_pages(false).await?))
}

/// admin_get_page
///
/// [Admin Route] Retrieves any page, published or not.
#[utoipa::path(
    get,
    path = "/admin/pages/{id}",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 200, description = "Page", body = PageResponse))
)]
pub async fn admin_get_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PageResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.get_page(id).await?))
}

/// create_page
///
/// [Admin Route] Creates a page shell without content. Variants are attached separately.
#[utoipa::path(
    post,
    path = "/admin/pages",
    request_body = PageRequest,
    responses(
        (status = 201, description = "Created", body = PageResponse),
        (status = 400, description = "Missing flags"),
        (status = 404, description = "Unknown link")
    )
)]
pub async fn create_page(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PageRequest>,
) -> AppResult<(StatusCode, Json<PageResponse>)> {
    auth.require_admin()?;
    let page = state.repo.create_page(payload.into_meta()?).await?;
    tracing::info!("page {} created by {}", page.id, auth.id);
    Ok((StatusCode::CREATED, Json(page)))
}

/// update_page
///
/// [Admin Route] Replaces the link, thumbnail and flags of a page. Contents are untouched.
#[utoipa::path(
    put,
    path = "/admin/pages/{id}",
    params(("id" = Uuid, Path, description = "Page id")),
    request_body = PageRequest,
    responses((status = 200, description = "Updated", body = PageResponse))
)]
pub async fn update_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<PageRequest>,
) -> AppResult<Json<PageResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.update_page(id, payload.into_meta()?).await?))
}

/// publish_page
///
/// [Admin Route] Makes a page visible to anonymous readers.
#[utoipa::path(
    put,
    path = "/admin/pages/{id}/publish",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 200, description = "Published", body = PageResponse))
)]
pub async fn publish_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PageResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.set_page_published(id, true).await?))
}

/// unpublish_page
///
/// [Admin Route] Turns a page back into a draft.
#[utoipa::path(
    put,
    path = "/admin/pages/{id}/unpublish",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 200, description = "Unpublished", body = PageResponse))
)]
pub async fn unpublish_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PageResponse>> {
    auth.require_admin()?;
    Ok(Json(state.repo.set_page_published(id, false).await?))
}

/// delete_page
///
/// [Admin Route] Deletes a page together with its contents and comments.
#[utoipa::path(
    delete,
    path = "/admin/pages/{id}",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.delete_page(id).await?;
    tracing::info!("page {} deleted by {}", id, auth.id);
    Ok(StatusCode::NO_CONTENT)
}

/// attach_page_content
///
/// [Admin Route] Adds the variant for one language. A page holds at most one variant per
/// language; a second attach for the same language is a 409 naming the language.
#[utoipa::path(
    post,
    path = "/admin/pages/{id}/content",
    params(("id" = Uuid, Path, description = "Page id")),
    request_body = CreateArticleContentRequest,
    responses(
        (status = 201, description = "Attached", body = PageContent),
        (status = 400, description = "Missing language, title or content"),
        (status = 404, description = "Unknown page or language"),
        (status = 409, description = "Language already present")
    )
)]
pub async fn attach_page_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateArticleContentRequest>,
) -> AppResult<(StatusCode, Json<PageContent>)> {
    auth.require_admin()?;
    let (language_id, fields) = payload.into_parts()?;
    let content = state.repo.attach_page_content(id, language_id, fields).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

/// update_page_content
///
/// [Admin Route] Replaces the text of one variant. The language itself cannot change.
#[utoipa::path(
    put,
    path = "/admin/pages/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    request_body = ArticleContentRequest,
    responses(
        (status = 200, description = "Updated", body = PageContent),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn update_page_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<ArticleContentRequest>,
) -> AppResult<Json<PageContent>> {
    auth.require_admin()?;
    payload.ensure_language(language_id)?;
    Ok(Json(state.repo.update_page_content(id, language_id, payload.fields).await?))
}

/// remove_page_content
///
/// [Admin Route] Deletes one variant.
#[utoipa::path(
    delete,
    path = "/admin/pages/{id}/content/{language_id}",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("language_id" = Uuid, Path, description = "Language id")
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "No content for this language")
    )
)]
pub async fn remove_page_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, language_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.remove_page_content(id, language_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// admin_list_page_authors
///
/// [Admin Route] Lists the authors of any page, drafts included.
#[utoipa::path(
    get,
    path = "/admin/pages/{id}/authors",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 200, description = "Authors", body = [Author]))
)]
pub async fn admin_list_page_authors(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Author>>> {
    auth.require_admin()?;
    Ok(Json(state.repo.list_page_authors(id).await?))
}

/// assign_page_author
///
/// [Admin Route] Credits a user on a page. Assigning an existing author changes nothing.
#[utoipa::path(
    put,
    path = "/admin/pages/{id}/authors/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Authors after the change", body = [Author]),
        (status = 404, description = "Unknown page or user")
    )
)]
pub async fn assign_page_author(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<Author>>> {
    auth.require_admin()?;
    let authors = state.repo.assign_page_author(id, user_id).await?;
    tracing::info!("user {} credited on page {} by {}", user_id, id, auth.id);
    Ok(Json(authors))
}

/// remove_page_author
///
/// [Admin Route] Removes a user's credit from a page.
#[utoipa::path(
    delete,
    path = "/admin/pages/{id}/authors/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not an author of this page")
    )
)]
pub async fn remove_page_author(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.repo.remove_page_author(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
