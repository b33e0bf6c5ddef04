use async_trait::async_trait;
use sqlx::{
    FromRow, PgConnection, PgPool, Postgres, query_builder::QueryBuilder, postgres::PgRow,
};
use uuid::Uuid;

use super::Repository;
use crate::error::{ApiError, AppResult};
use crate::localized::{AggregateRoot, ContentSet, Localized, ParentKind, assemble_all};
use crate::models::role::ROLE_USER;
use crate::models::{
    ArticleFields, ArticleMeta, Author, BioFields, Comment, CommentRow, CommentTarget,
    GlobalSettings, Homepage, HomepageContent, HomepageFields, HomepageRequest, HomepageResponse,
    Language, LanguageRequest, Link, LinkFields, LinkScope, NewUser, Page, PageContent,
    PageResponse, Post, PostContent, PostResponse, Role, RoleRequest, SettingsChanges, UserBio,
    UserChanges, UserResponse,
};

/// PostgresRepository
///
/// The production implementation of `Repository`. Each method runs in its own transaction.
/// The one-content-per-language rule is enforced by the `UNIQUE (parent_id, language_id)`
/// constraints: inserts use `ON CONFLICT DO NOTHING RETURNING` and treat "no row back" as a
/// duplicate, so concurrent attaches for the same language cannot both succeed.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Strictly increasing even when two writes land within the same transaction clock tick.
const TOUCH: &str = "updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')";

const LANGUAGE_COLUMNS: &str = "id, name, abbreviation, font_awesome_icon, mdi_icon";
const LINK_COLUMNS: &str = "id, url, name, font_awesome_icon, mdi_icon, type, scope";
const ROLE_COLUMNS: &str = "id, name, created_at, updated_at";

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.first_name, u.last_name, u.title, u.affiliation, u.thumbnail,
           COALESCE(ARRAY_AGG(r.name ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL), '{}') AS roles,
           u.created_at, u.updated_at
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.post_id, c.page_id, c.user_id,
           u.username, u.first_name, u.last_name, u.title, u.affiliation, u.thumbnail,
           c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

const AUTHOR_COLUMNS: &str = "u.id, u.username, u.first_name, u.last_name, u.title, u.affiliation, u.thumbnail";

const SETTINGS_COLUMNS: &str = "id, session_duration_minutes, logo_url, website_name, global_comments_enabled, \
    maintenance_mode, max_upload_size_mb, default_language, analytics_tracking_id, contact_email, \
    meta_description, max_items_per_page, sso_auth_enabled, password_auth_enabled, created_at, updated_at";

/// Table layout of one kind of localized record.
struct ContentTable {
    kind: ParentKind,
    parent_table: &'static str,
    table: &'static str,
    parent_column: &'static str,
    columns: &'static str,
}

/// Table layout of one kind of aggregate parent.
struct ParentTable {
    table: &'static str,
    columns: &'static str,
    content: ContentTable,
}

const PAGES: ParentTable = ParentTable {
    table: "pages",
    columns: "id, link_id, thumbnail, comments_enabled, published, created_at, updated_at",
    content: ContentTable {
        kind: ParentKind::Page,
        parent_table: "pages",
        table: "page_contents",
        parent_column: "page_id",
        columns: "id, page_id, language_id, title, content, short_description, keywords, created_at, updated_at",
    },
};

const POSTS: ParentTable = ParentTable {
    table: "posts",
    columns: "id, link_id, thumbnail, comments_enabled, published, created_at, updated_at",
    content: ContentTable {
        kind: ParentKind::Post,
        parent_table: "posts",
        table: "post_contents",
        parent_column: "post_id",
        columns: "id, post_id, language_id, title, content, short_description, keywords, created_at, updated_at",
    },
};

const HOMEPAGES: ParentTable = ParentTable {
    table: "homepages",
    columns: "id, link_id, thumbnail, created_at, updated_at",
    content: ContentTable {
        kind: ParentKind::Homepage,
        parent_table: "homepages",
        table: "homepage_contents",
        parent_column: "homepage_id",
        columns: "id, homepage_id, language_id, welcome_message, welcome_message_extended, \
                  explore_our_work, get_involved, important_links, ecosystem_links, blog, papers, \
                  read_more, created_at, updated_at",
    },
};

/// Join table crediting users on one kind of aggregate.
struct AuthorTable {
    parent: &'static ParentTable,
    table: &'static str,
    parent_column: &'static str,
}

const PAGE_AUTHORS: AuthorTable = AuthorTable {
    parent: &PAGES,
    table: "page_authors",
    parent_column: "page_id",
};

const POST_AUTHORS: AuthorTable = AuthorTable {
    parent: &POSTS,
    table: "post_authors",
    parent_column: "post_id",
};

const USER_BIOS: ContentTable = ContentTable {
    kind: ParentKind::User,
    parent_table: "users",
    table: "user_bios",
    parent_column: "user_id",
    columns: "id, user_id, language_id, bio, created_at, updated_at",
};

/// Anything `query_as` can decode from a Postgres row.
trait Row: for<'r> FromRow<'r, PgRow> + Send + Unpin {}
impl<T> Row for T where T: for<'r> FromRow<'r, PgRow> + Send + Unpin {}

/// Logs a driver error with the failing operation and converts it. Constraint violations
/// become `Conflict` and are logged at warn; everything else is an error.
fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |e| {
        let err = ApiError::from(e);
        match &err {
            ApiError::Database(inner) => tracing::error!("{operation} error: {:?}", inner),
            other => tracing::warn!("{operation} rejected: {}", other),
        }
        err
    }
}

/// Like `db_error`, but a unique violation is reported with `conflict` as the message.
fn unique_violation(operation: &'static str, conflict: String) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |e| {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            tracing::warn!("{operation} rejected: {conflict}");
            return ApiError::Conflict(conflict);
        }
        db_error(operation)(e)
    }
}

async fn ensure_exists(conn: &mut PgConnection, table: &str, entity: &str, id: Uuid) -> AppResult<()> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error("ensure_exists"))?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::not_found(entity, id))
    }
}

async fn ensure_link(conn: &mut PgConnection, link_id: Option<Uuid>) -> AppResult<()> {
    match link_id {
        Some(id) => ensure_exists(conn, "links", "Link", id).await,
        None => Ok(()),
    }
}

async fn language_abbreviation(conn: &mut PgConnection, id: Uuid) -> AppResult<String> {
    sqlx::query_scalar::<_, String>("SELECT abbreviation FROM languages WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("language_abbreviation"))?
        .ok_or_else(|| ApiError::not_found("Language", id))
}

// --- Localized content helpers ---

async fn list_contents<R: Row>(conn: &mut PgConnection, t: &ContentTable, parent_id: Uuid) -> AppResult<Vec<R>> {
    ensure_exists(conn, t.parent_table, t.kind.label(), parent_id).await?;
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = $1 ORDER BY language_id",
        t.columns, t.table, t.parent_column
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(parent_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("list_contents"))
}

async fn contents_of_parents<R: Row>(conn: &mut PgConnection, t: &ContentTable, parent_ids: Vec<Uuid>) -> AppResult<Vec<R>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ANY($1) ORDER BY language_id",
        t.columns, t.table, t.parent_column
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(parent_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("contents_of_parents"))
}

async fn get_content<R: Row>(conn: &mut PgConnection, t: &ContentTable, parent_id: Uuid, language_id: Uuid) -> AppResult<R> {
    ensure_exists(conn, t.parent_table, t.kind.label(), parent_id).await?;
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = $1 AND language_id = $2",
        t.columns, t.table, t.parent_column
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(parent_id)
        .bind(language_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("get_content"))?
        .ok_or_else(|| ApiError::missing_content(t.kind, parent_id, language_id))
}

async fn remove_content(conn: &mut PgConnection, t: &ContentTable, parent_id: Uuid, language_id: Uuid) -> AppResult<()> {
    ensure_exists(conn, t.parent_table, t.kind.label(), parent_id).await?;
    let sql = format!("DELETE FROM {} WHERE {} = $1 AND language_id = $2", t.table, t.parent_column);
    let result = sqlx::query(&sql)
        .bind(parent_id)
        .bind(language_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error("remove_content"))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::missing_content(t.kind, parent_id, language_id));
    }
    Ok(())
}

/// Checks parent and language, returning the language abbreviation for conflict messages.
async fn prepare_attach(conn: &mut PgConnection, t: &ContentTable, parent_id: Uuid, language_id: Uuid) -> AppResult<String> {
    ensure_exists(conn, t.parent_table, t.kind.label(), parent_id).await?;
    language_abbreviation(conn, language_id).await
}

async fn attach_article<R: Row>(
    conn: &mut PgConnection,
    t: &ContentTable,
    parent_id: Uuid,
    language_id: Uuid,
    fields: ArticleFields,
) -> AppResult<R> {
    let abbreviation = prepare_attach(conn, t, parent_id, language_id).await?;
    let sql = format!(
        "INSERT INTO {table} (id, {parent}, language_id, title, content, short_description, keywords) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT ({parent}, language_id) DO NOTHING \
         RETURNING {columns}",
        table = t.table,
        parent = t.parent_column,
        columns = t.columns
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(Uuid::new_v4())
        .bind(parent_id)
        .bind(language_id)
        .bind(fields.title)
        .bind(fields.content)
        .bind(fields.short_description)
        .bind(fields.keywords)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("attach_article"))?
        .ok_or_else(|| ApiError::duplicate_content(t.kind, parent_id, &abbreviation, language_id))
}

async fn update_article<R: Row>(
    conn: &mut PgConnection,
    t: &ContentTable,
    parent_id: Uuid,
    language_id: Uuid,
    fields: ArticleFields,
) -> AppResult<R> {
    ensure_exists(conn, t.parent_table, t.kind.label(), parent_id).await?;
    let sql = format!(
        "UPDATE {table} SET title = $3, content = $4, short_description = $5, keywords = $6, {TOUCH} \
         WHERE {parent} = $1 AND language_id = $2 \
         RETURNING {columns}",
        table = t.table,
        parent = t.parent_column,
        columns = t.columns
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(parent_id)
        .bind(language_id)
        .bind(fields.title)
        .bind(fields.content)
        .bind(fields.short_description)
        .bind(fields.keywords)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("update_article"))?
        .ok_or_else(|| ApiError::missing_content(t.kind, parent_id, language_id))
}

// --- Aggregate helpers ---

async fn find_parent<P: Row>(conn: &mut PgConnection, t: &ParentTable, id: Uuid) -> AppResult<P> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", t.columns, t.table);
    sqlx::query_as::<_, P>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("find_parent"))?
        .ok_or_else(|| ApiError::not_found(t.content.kind.label(), id))
}

/// Loads the content set of an already-fetched parent and projects the aggregate.
async fn assemble<P>(conn: &mut PgConnection, t: &ParentTable, parent: P) -> AppResult<P::Response>
where
    P: AggregateRoot + Row,
    P::Content: Row,
{
    let contents: Vec<P::Content> = list_contents(conn, &t.content, parent.id()).await?;
    let set = ContentSet::from_records(contents)?;
    Ok(Localized::with_contents(parent, set).into_response())
}

async fn load_aggregate<P>(conn: &mut PgConnection, t: &ParentTable, id: Uuid) -> AppResult<P::Response>
where
    P: AggregateRoot + Row,
    P::Content: Row,
{
    let parent: P = find_parent(conn, t, id).await?;
    assemble(conn, t, parent).await
}

/// Newest first. `published_only` applies to tables that carry a `published` column;
/// `author` keeps only the aggregates credited to that user.
async fn list_aggregates<P>(
    conn: &mut PgConnection,
    t: &ParentTable,
    published_only: bool,
    author: Option<(&AuthorTable, Uuid)>,
) -> AppResult<Vec<P::Response>>
where
    P: AggregateRoot + Row,
    P::Content: Row,
{
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM {}", t.columns, t.table));
    if published_only {
        builder.push(" WHERE published = true");
    }
    if let Some((a, user_id)) = author {
        builder.push(if published_only { " AND " } else { " WHERE " });
        builder.push(format!("id IN (SELECT {} FROM {} WHERE user_id = ", a.parent_column, a.table));
        builder.push_bind(user_id);
        builder.push(")");
    }
    builder.push(" ORDER BY created_at DESC, id");

    let parents: Vec<P> = builder
        .build_query_as::<P>()
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("list_aggregates"))?;
    let ids: Vec<Uuid> = parents.iter().map(|p| p.id()).collect();
    let contents: Vec<P::Content> = contents_of_parents(conn, &t.content, ids).await?;
    Ok(assemble_all(parents, contents)?)
}

async fn delete_parent(conn: &mut PgConnection, t: &ParentTable, id: Uuid) -> AppResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = $1", t.table);
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(db_error("delete_parent"))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(t.content.kind.label(), id));
    }
    Ok(())
}

/// Shared by pages and posts, which have identical parent columns.
async fn insert_article_parent<P>(conn: &mut PgConnection, t: &ParentTable, meta: ArticleMeta) -> AppResult<P::Response>
where
    P: AggregateRoot + Row,
{
    ensure_link(conn, meta.link_id).await?;
    let sql = format!(
        "INSERT INTO {} (id, link_id, thumbnail, comments_enabled, published) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        t.table, t.columns
    );
    let parent: P = sqlx::query_as::<_, P>(&sql)
        .bind(Uuid::new_v4())
        .bind(meta.link_id)
        .bind(meta.thumbnail)
        .bind(meta.comments_enabled)
        .bind(meta.published)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error("insert_article_parent"))?;
    Ok(Localized::new(parent).into_response())
}

async fn update_article_parent<P>(conn: &mut PgConnection, t: &ParentTable, id: Uuid, meta: ArticleMeta) -> AppResult<P::Response>
where
    P: AggregateRoot + Row,
    P::Content: Row,
{
    ensure_link(conn, meta.link_id).await?;
    let sql = format!(
        "UPDATE {} SET link_id = $2, thumbnail = $3, comments_enabled = $4, published = $5, {TOUCH} \
         WHERE id = $1 RETURNING {}",
        t.table, t.columns
    );
    let parent: P = sqlx::query_as::<_, P>(&sql)
        .bind(id)
        .bind(meta.link_id)
        .bind(meta.thumbnail)
        .bind(meta.comments_enabled)
        .bind(meta.published)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("update_article_parent"))?
        .ok_or_else(|| ApiError::not_found(t.content.kind.label(), id))?;
    assemble(conn, t, parent).await
}

async fn set_published<P>(conn: &mut PgConnection, t: &ParentTable, id: Uuid, published: bool) -> AppResult<P::Response>
where
    P: AggregateRoot + Row,
    P::Content: Row,
{
    let sql = format!(
        "UPDATE {} SET published = $2, {TOUCH} WHERE id = $1 RETURNING {}",
        t.table, t.columns
    );
    let parent: P = sqlx::query_as::<_, P>(&sql)
        .bind(id)
        .bind(published)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("set_published"))?
        .ok_or_else(|| ApiError::not_found(t.content.kind.label(), id))?;
    assemble(conn, t, parent).await
}

// --- Author helpers ---

async fn list_authors(conn: &mut PgConnection, a: &AuthorTable, parent_id: Uuid) -> AppResult<Vec<Author>> {
    ensure_exists(conn, a.parent.table, a.parent.content.kind.label(), parent_id).await?;
    let sql = format!(
        "SELECT {AUTHOR_COLUMNS} FROM {} a JOIN users u ON u.id = a.user_id \
         WHERE a.{} = $1 ORDER BY u.username",
        a.table, a.parent_column
    );
    sqlx::query_as::<_, Author>(&sql)
        .bind(parent_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("list_authors"))
}

async fn assign_author(conn: &mut PgConnection, a: &AuthorTable, parent_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>> {
    ensure_exists(conn, "users", "User", user_id).await?;
    // FOR SHARE keeps the parent from being deleted before the insert commits.
    let sql = format!("SELECT id FROM {} WHERE id = $1 FOR SHARE", a.parent.table);
    sqlx::query_scalar::<_, Uuid>(&sql)
        .bind(parent_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("assign_author"))?
        .ok_or_else(|| ApiError::not_found(a.parent.content.kind.label(), parent_id))?;
    let sql = format!(
        "INSERT INTO {} ({}, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        a.table, a.parent_column
    );
    sqlx::query(&sql)
        .bind(parent_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error("assign_author"))?;
    list_authors(conn, a, parent_id).await
}

async fn remove_author(conn: &mut PgConnection, a: &AuthorTable, parent_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let kind = a.parent.content.kind;
    ensure_exists(conn, a.parent.table, kind.label(), parent_id).await?;
    let sql = format!("DELETE FROM {} WHERE {} = $1 AND user_id = $2", a.table, a.parent_column);
    let result = sqlx::query(&sql)
        .bind(parent_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error("remove_author"))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!(
            "User {user_id} is not an author of {} {parent_id}",
            kind.as_str()
        )));
    }
    Ok(())
}

// --- User helpers ---

async fn fetch_user(conn: &mut PgConnection, id: Uuid) -> AppResult<UserResponse> {
    let sql = format!("{USER_SELECT} WHERE u.id = $1 GROUP BY u.id");
    sqlx::query_as::<_, UserResponse>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("fetch_user"))?
        .ok_or_else(|| ApiError::not_found("User", id))
}

/// Names the column behind a users unique violation.
fn user_conflict(operation: &'static str, username: &str, email: &str) -> impl FnOnce(sqlx::Error) -> ApiError {
    let username = username.to_string();
    let email = email.to_string();
    move |e| {
        let constraint = e
            .as_database_error()
            .filter(|db| db.is_unique_violation())
            .map(|db| db.constraint().unwrap_or_default().to_string());
        match constraint {
            Some(c) if c.contains("email") => {
                ApiError::Conflict(format!("Email {email} is already registered"))
            }
            Some(_) => ApiError::Conflict(format!("Username {username} is already taken")),
            None => db_error(operation)(e),
        }
    }
}

// --- Comment helpers ---

async fn fetch_comment(conn: &mut PgConnection, id: Uuid) -> AppResult<Comment> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = $1");
    sqlx::query_as::<_, CommentRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("fetch_comment"))?
        .ok_or_else(|| ApiError::not_found("Comment", id))?
        .try_into()
}

async fn fetch_comments(conn: &mut PgConnection, filter_column: &str, id: Uuid) -> AppResult<Vec<Comment>> {
    let sql = format!("{COMMENT_SELECT} WHERE {filter_column} = $1 ORDER BY c.created_at DESC, c.id");
    sqlx::query_as::<_, CommentRow>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("fetch_comments"))?
        .into_iter()
        .map(Comment::try_from)
        .collect()
}

fn target_table(target: CommentTarget) -> &'static ParentTable {
    match target {
        CommentTarget::Post(_) => &POSTS,
        CommentTarget::Page(_) => &PAGES,
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Languages ---

    async fn list_languages(&self) -> AppResult<Vec<Language>> {
        let sql = format!("SELECT {LANGUAGE_COLUMNS} FROM languages ORDER BY name, abbreviation");
        sqlx::query_as::<_, Language>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_languages"))
    }

    async fn get_language(&self, id: Uuid) -> AppResult<Language> {
        let sql = format!("SELECT {LANGUAGE_COLUMNS} FROM languages WHERE id = $1");
        sqlx::query_as::<_, Language>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get_language"))?
            .ok_or_else(|| ApiError::not_found("Language", id))
    }

    async fn create_language(&self, req: LanguageRequest) -> AppResult<Language> {
        let conflict = format!("Language with abbreviation {} already exists", req.abbreviation);
        let sql = format!(
            "INSERT INTO languages ({LANGUAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5) RETURNING {LANGUAGE_COLUMNS}"
        );
        sqlx::query_as::<_, Language>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name)
            .bind(req.abbreviation)
            .bind(req.font_awesome_icon)
            .bind(req.mdi_icon)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation("create_language", conflict))
    }

    async fn update_language(&self, id: Uuid, req: LanguageRequest) -> AppResult<Language> {
        let conflict = format!("Language with abbreviation {} already exists", req.abbreviation);
        let sql = format!(
            "UPDATE languages SET name = $2, abbreviation = $3, font_awesome_icon = $4, mdi_icon = $5 \
             WHERE id = $1 RETURNING {LANGUAGE_COLUMNS}"
        );
        sqlx::query_as::<_, Language>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.abbreviation)
            .bind(req.font_awesome_icon)
            .bind(req.mdi_icon)
            .fetch_optional(&self.pool)
            .await
            .map_err(unique_violation("update_language", conflict))?
            .ok_or_else(|| ApiError::not_found("Language", id))
    }

    async fn delete_language(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("delete_language"))?;
        let abbreviation = language_abbreviation(&mut tx, id).await?;
        sqlx::query("DELETE FROM languages WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                    ApiError::Conflict(format!(
                        "Language {abbreviation} is still used by content or bios"
                    ))
                } else {
                    db_error("delete_language")(e)
                }
            })?;
        tx.commit().await.map_err(db_error("delete_language"))?;
        Ok(())
    }

    // --- Links ---

    async fn list_links(&self, scope: Option<LinkScope>) -> AppResult<Vec<Link>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {LINK_COLUMNS} FROM links"));
        if let Some(scope) = scope {
            builder.push(" WHERE scope = ");
            builder.push_bind(scope);
        }
        builder.push(" ORDER BY url, id");

        builder
            .build_query_as::<Link>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_links"))
    }

    async fn get_link(&self, id: Uuid) -> AppResult<Link> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1");
        sqlx::query_as::<_, Link>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get_link"))?
            .ok_or_else(|| ApiError::not_found("Link", id))
    }

    async fn create_link(&self, link: LinkFields) -> AppResult<Link> {
        let sql = format!(
            "INSERT INTO links ({LINK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {LINK_COLUMNS}"
        );
        sqlx::query_as::<_, Link>(&sql)
            .bind(Uuid::new_v4())
            .bind(link.url)
            .bind(link.name)
            .bind(link.font_awesome_icon)
            .bind(link.mdi_icon)
            .bind(link.link_type)
            .bind(link.scope)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("create_link"))
    }

    async fn update_link(&self, id: Uuid, link: LinkFields) -> AppResult<Link> {
        let sql = format!(
            "UPDATE links SET url = $2, name = $3, font_awesome_icon = $4, mdi_icon = $5, type = $6, \
             scope = $7 WHERE id = $1 RETURNING {LINK_COLUMNS}"
        );
        sqlx::query_as::<_, Link>(&sql)
            .bind(id)
            .bind(link.url)
            .bind(link.name)
            .bind(link.font_awesome_icon)
            .bind(link.mdi_icon)
            .bind(link.link_type)
            .bind(link.scope)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("update_link"))?
            .ok_or_else(|| ApiError::not_found("Link", id))
    }

    /// Referencing pages, posts and homepages are cleared by `ON DELETE SET NULL`.
    async fn delete_link(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_link"))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Link", id));
        }
        Ok(())
    }

    // --- Roles ---

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name");
        sqlx::query_as::<_, Role>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_roles"))
    }

    async fn get_role(&self, id: Uuid) -> AppResult<Role> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1");
        sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get_role"))?
            .ok_or_else(|| ApiError::not_found("Role", id))
    }

    async fn get_role_by_name(&self, name: &str) -> AppResult<Role> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1");
        sqlx::query_as::<_, Role>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get_role_by_name"))?
            .ok_or_else(|| ApiError::NotFound(format!("Role not found with name: {name}")))
    }

    async fn create_role(&self, req: RoleRequest) -> AppResult<Role> {
        let conflict = format!("Role {} already exists", req.name);
        let sql = format!("INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING {ROLE_COLUMNS}");
        sqlx::query_as::<_, Role>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation("create_role", conflict))
    }

    async fn update_role(&self, id: Uuid, req: RoleRequest) -> AppResult<Role> {
        let conflict = format!("Role {} already exists", req.name);
        let sql = format!("UPDATE roles SET name = $2, {TOUCH} WHERE id = $1 RETURNING {ROLE_COLUMNS}");
        sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .bind(req.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unique_violation("update_role", conflict))?
            .ok_or_else(|| ApiError::not_found("Role", id))
    }

    async fn delete_role(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_role"))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Role", id));
        }
        Ok(())
    }

    // --- Users ---

    async fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        let sql = format!("{USER_SELECT} GROUP BY u.id ORDER BY u.username");
        sqlx::query_as::<_, UserResponse>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_users"))
    }

    async fn get_user(&self, id: Uuid) -> AppResult<UserResponse> {
        let mut conn = self.pool.acquire().await.map_err(db_error("get_user"))?;
        fetch_user(&mut conn, id).await
    }

    async fn count_users(&self) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count_users"))
    }

    async fn create_user(&self, user: NewUser) -> AppResult<UserResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("create_user"))?;
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, first_name, last_name, title, affiliation, thumbnail)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.title)
        .bind(&user.affiliation)
        .bind(&user.thumbnail)
        .execute(&mut *tx)
        .await
        .map_err(user_conflict("create_user", &user.username, &user.email))?;

        let assigned = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
        )
        .bind(id)
        .bind(ROLE_USER)
        .execute(&mut *tx)
        .await
        .map_err(db_error("create_user"))?;
        if assigned.rows_affected() == 0 {
            return Err(ApiError::Internal(format!("default role {ROLE_USER} is missing")));
        }

        let created = fetch_user(&mut tx, id).await?;
        tx.commit().await.map_err(db_error("create_user"))?;
        Ok(created)
    }

    /// Uses `COALESCE` so that only the provided columns change.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<UserResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_user"))?;
        let username = changes.username.clone().unwrap_or_default();
        let email = changes.email.clone().unwrap_or_default();
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                title = COALESCE($7, title),
                affiliation = COALESCE($8, affiliation),
                thumbnail = COALESCE($9, thumbnail),
                {TOUCH}
            WHERE id = $1
            "#
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.title)
            .bind(changes.affiliation)
            .bind(changes.thumbnail)
            .execute(&mut *tx)
            .await
            .map_err(user_conflict("update_user", &username, &email))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("User", id));
        }

        let updated = fetch_user(&mut tx, id).await?;
        tx.commit().await.map_err(db_error("update_user"))?;
        Ok(updated)
    }

    /// Comments, bios and role assignments go with the user (`ON DELETE CASCADE`).
    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_user"))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("User", id));
        }
        Ok(())
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<UserResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("assign_role"))?;
        ensure_exists(&mut tx, "users", "User", user_id).await?;
        ensure_exists(&mut tx, "roles", "Role", role_id).await?;
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("assign_role"))?;
        let user = fetch_user(&mut tx, user_id).await?;
        tx.commit().await.map_err(db_error("assign_role"))?;
        Ok(user)
    }

    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<UserResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("revoke_role"))?;
        ensure_exists(&mut tx, "users", "User", user_id).await?;
        ensure_exists(&mut tx, "roles", "Role", role_id).await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("revoke_role"))?;
        let user = fetch_user(&mut tx, user_id).await?;
        tx.commit().await.map_err(db_error("revoke_role"))?;
        Ok(user)
    }

    // --- User bios ---

    async fn list_bios(&self, user_id: Uuid) -> AppResult<Vec<UserBio>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_bios"))?;
        let bios = list_contents(&mut tx, &USER_BIOS, user_id).await?;
        tx.commit().await.map_err(db_error("list_bios"))?;
        Ok(bios)
    }

    async fn get_bio(&self, user_id: Uuid, language_id: Uuid) -> AppResult<UserBio> {
        let mut tx = self.pool.begin().await.map_err(db_error("get_bio"))?;
        let bio = get_content(&mut tx, &USER_BIOS, user_id, language_id).await?;
        tx.commit().await.map_err(db_error("get_bio"))?;
        Ok(bio)
    }

    async fn create_bio(&self, user_id: Uuid, language_id: Uuid, fields: BioFields) -> AppResult<UserBio> {
        let mut tx = self.pool.begin().await.map_err(db_error("create_bio"))?;
        let abbreviation = prepare_attach(&mut tx, &USER_BIOS, user_id, language_id).await?;
        let sql = format!(
            "INSERT INTO user_bios (id, user_id, language_id, bio) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, language_id) DO NOTHING RETURNING {}",
            USER_BIOS.columns
        );
        let bio = sqlx::query_as::<_, UserBio>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(language_id)
            .bind(fields.bio)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("create_bio"))?
            .ok_or_else(|| {
                ApiError::duplicate_content(ParentKind::User, user_id, &abbreviation, language_id)
            })?;
        tx.commit().await.map_err(db_error("create_bio"))?;
        Ok(bio)
    }

    async fn update_bio(&self, user_id: Uuid, language_id: Uuid, fields: BioFields) -> AppResult<UserBio> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_bio"))?;
        ensure_exists(&mut tx, "users", "User", user_id).await?;
        let sql = format!(
            "UPDATE user_bios SET bio = $3, {TOUCH} WHERE user_id = $1 AND language_id = $2 RETURNING {}",
            USER_BIOS.columns
        );
        let bio = sqlx::query_as::<_, UserBio>(&sql)
            .bind(user_id)
            .bind(language_id)
            .bind(fields.bio)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("update_bio"))?
            .ok_or_else(|| ApiError::missing_content(ParentKind::User, user_id, language_id))?;
        tx.commit().await.map_err(db_error("update_bio"))?;
        Ok(bio)
    }

    async fn delete_bio(&self, user_id: Uuid, language_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("delete_bio"))?;
        remove_content(&mut tx, &USER_BIOS, user_id, language_id).await?;
        tx.commit().await.map_err(db_error("delete_bio"))?;
        Ok(())
    }

    // --- Pages ---

    async fn list_pages(&self, published_only: bool) -> AppResult<Vec<PageResponse>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_pages"))?;
        let pages = list_aggregates::<Page>(&mut tx, &PAGES, published_only, None).await?;
        tx.commit().await.map_err(db_error("list_pages"))?;
        Ok(pages)
    }

    async fn get_page(&self, id: Uuid) -> AppResult<PageResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("get_page"))?;
        let page = load_aggregate::<Page>(&mut tx, &PAGES, id).await?;
        tx.commit().await.map_err(db_error("get_page"))?;
        Ok(page)
    }

    async fn create_page(&self, meta: ArticleMeta) -> AppResult<PageResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("create_page"))?;
        let page = insert_article_parent::<Page>(&mut tx, &PAGES, meta).await?;
        tx.commit().await.map_err(db_error("create_page"))?;
        Ok(page)
    }

    async fn update_page(&self, id: Uuid, meta: ArticleMeta) -> AppResult<PageResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_page"))?;
        let page = update_article_parent::<Page>(&mut tx, &PAGES, id, meta).await?;
        tx.commit().await.map_err(db_error("update_page"))?;
        Ok(page)
    }

    async fn set_page_published(&self, id: Uuid, published: bool) -> AppResult<PageResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("set_page_published"))?;
        let page = set_published::<Page>(&mut tx, &PAGES, id, published).await?;
        tx.commit().await.map_err(db_error("set_page_published"))?;
        Ok(page)
    }

    /// Contents and comments go with the page (`ON DELETE CASCADE`).
    async fn delete_page(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(db_error("delete_page"))?;
        delete_parent(&mut conn, &PAGES, id).await
    }

    async fn list_page_contents(&self, page_id: Uuid) -> AppResult<Vec<PageContent>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_page_contents"))?;
        let contents = list_contents(&mut tx, &PAGES.content, page_id).await?;
        tx.commit().await.map_err(db_error("list_page_contents"))?;
        Ok(contents)
    }

    async fn get_page_content(&self, page_id: Uuid, language_id: Uuid) -> AppResult<PageContent> {
        let mut tx = self.pool.begin().await.map_err(db_error("get_page_content"))?;
        let content = get_content(&mut tx, &PAGES.content, page_id, language_id).await?;
        tx.commit().await.map_err(db_error("get_page_content"))?;
        Ok(content)
    }

    async fn attach_page_content(&self, page_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PageContent> {
        let mut tx = self.pool.begin().await.map_err(db_error("attach_page_content"))?;
        let content = attach_article(&mut tx, &PAGES.content, page_id, language_id, fields).await?;
        tx.commit().await.map_err(db_error("attach_page_content"))?;
        Ok(content)
    }

    async fn update_page_content(&self, page_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PageContent> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_page_content"))?;
        let content = update_article(&mut tx, &PAGES.content, page_id, language_id, fields).await?;
        tx.commit().await.map_err(db_error("update_page_content"))?;
        Ok(content)
    }

    async fn remove_page_content(&self, page_id: Uuid, language_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("remove_page_content"))?;
        remove_content(&mut tx, &PAGES.content, page_id, language_id).await?;
        tx.commit().await.map_err(db_error("remove_page_content"))?;
        Ok(())
    }

    async fn list_page_authors(&self, page_id: Uuid) -> AppResult<Vec<Author>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_page_authors"))?;
        let authors = list_authors(&mut tx, &PAGE_AUTHORS, page_id).await?;
        tx.commit().await.map_err(db_error("list_page_authors"))?;
        Ok(authors)
    }

    async fn list_pages_by_author(&self, user_id: Uuid, published_only: bool) -> AppResult<Vec<PageResponse>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_pages_by_author"))?;
        ensure_exists(&mut tx, "users", "User", user_id).await?;
        let pages = list_aggregates::<Page>(&mut tx, &PAGES, published_only, Some((&PAGE_AUTHORS, user_id))).await?;
        tx.commit().await.map_err(db_error("list_pages_by_author"))?;
        Ok(pages)
    }

    async fn assign_page_author(&self, page_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>> {
        let mut tx = self.pool.begin().await.map_err(db_error("assign_page_author"))?;
        let authors = assign_author(&mut tx, &PAGE_AUTHORS, page_id, user_id).await?;
        tx.commit().await.map_err(db_error("assign_page_author"))?;
        Ok(authors)
    }

    async fn remove_page_author(&self, page_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("remove_page_author"))?;
        remove_author(&mut tx, &PAGE_AUTHORS, page_id, user_id).await?;
        tx.commit().await.map_err(db_error("remove_page_author"))?;
        Ok(())
    }

    // --- Posts ---

    async fn list_posts(&self, published_only: bool) -> AppResult<Vec<PostResponse>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_posts"))?;
        let posts = list_aggregates::<Post>(&mut tx, &POSTS, published_only, None).await?;
        tx.commit().await.map_err(db_error("list_posts"))?;
        Ok(posts)
    }

    async fn get_post(&self, id: Uuid) -> AppResult<PostResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("get_post"))?;
        let post = load_aggregate::<Post>(&mut tx, &POSTS, id).await?;
        tx.commit().await.map_err(db_error("get_post"))?;
        Ok(post)
    }

    async fn create_post(&self, meta: ArticleMeta) -> AppResult<PostResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("create_post"))?;
        let post = insert_article_parent::<Post>(&mut tx, &POSTS, meta).await?;
        tx.commit().await.map_err(db_error("create_post"))?;
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, meta: ArticleMeta) -> AppResult<PostResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_post"))?;
        let post = update_article_parent::<Post>(&mut tx, &POSTS, id, meta).await?;
        tx.commit().await.map_err(db_error("update_post"))?;
        Ok(post)
    }

    async fn set_post_published(&self, id: Uuid, published: bool) -> AppResult<PostResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("set_post_published"))?;
        let post = set_published::<Post>(&mut tx, &POSTS, id, published).await?;
        tx.commit().await.map_err(db_error("set_post_published"))?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(db_error("delete_post"))?;
        delete_parent(&mut conn, &POSTS, id).await
    }

    async fn list_post_contents(&self, post_id: Uuid) -> AppResult<Vec<PostContent>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_post_contents"))?;
        let contents = list_contents(&mut tx, &POSTS.content, post_id).await?;
        tx.commit().await.map_err(db_error("list_post_contents"))?;
        Ok(contents)
    }

    async fn get_post_content(&self, post_id: Uuid, language_id: Uuid) -> AppResult<PostContent> {
        let mut tx = self.pool.begin().await.map_err(db_error("get_post_content"))?;
        let content = get_content(&mut tx, &POSTS.content, post_id, language_id).await?;
        tx.commit().await.map_err(db_error("get_post_content"))?;
        Ok(content)
    }

    async fn attach_post_content(&self, post_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PostContent> {
        let mut tx = self.pool.begin().await.map_err(db_error("attach_post_content"))?;
        let content = attach_article(&mut tx, &POSTS.content, post_id, language_id, fields).await?;
        tx.commit().await.map_err(db_error("attach_post_content"))?;
        Ok(content)
    }

    async fn update_post_content(&self, post_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PostContent> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_post_content"))?;
        let content = update_article(&mut tx, &POSTS.content, post_id, language_id, fields).await?;
        tx.commit().await.map_err(db_error("update_post_content"))?;
        Ok(content)
    }

    async fn remove_post_content(&self, post_id: Uuid, language_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("remove_post_content"))?;
        remove_content(&mut tx, &POSTS.content, post_id, language_id).await?;
        tx.commit().await.map_err(db_error("remove_post_content"))?;
        Ok(())
    }

    async fn list_post_authors(&self, post_id: Uuid) -> AppResult<Vec<Author>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_post_authors"))?;
        let authors = list_authors(&mut tx, &POST_AUTHORS, post_id).await?;
        tx.commit().await.map_err(db_error("list_post_authors"))?;
        Ok(authors)
    }

    async fn list_posts_by_author(&self, user_id: Uuid, published_only: bool) -> AppResult<Vec<PostResponse>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_posts_by_author"))?;
        ensure_exists(&mut tx, "users", "User", user_id).await?;
        let posts = list_aggregates::<Post>(&mut tx, &POSTS, published_only, Some((&POST_AUTHORS, user_id))).await?;
        tx.commit().await.map_err(db_error("list_posts_by_author"))?;
        Ok(posts)
    }

    async fn assign_post_author(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>> {
        let mut tx = self.pool.begin().await.map_err(db_error("assign_post_author"))?;
        let authors = assign_author(&mut tx, &POST_AUTHORS, post_id, user_id).await?;
        tx.commit().await.map_err(db_error("assign_post_author"))?;
        Ok(authors)
    }

    async fn remove_post_author(&self, post_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("remove_post_author"))?;
        remove_author(&mut tx, &POST_AUTHORS, post_id, user_id).await?;
        tx.commit().await.map_err(db_error("remove_post_author"))?;
        Ok(())
    }

    // --- Homepages ---

    async fn list_homepages(&self) -> AppResult<Vec<HomepageResponse>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_homepages"))?;
        let homepages = list_aggregates::<Homepage>(&mut tx, &HOMEPAGES, false, None).await?;
        tx.commit().await.map_err(db_error("list_homepages"))?;
        Ok(homepages)
    }

    async fn get_homepage(&self, id: Uuid) -> AppResult<HomepageResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("get_homepage"))?;
        let homepage = load_aggregate::<Homepage>(&mut tx, &HOMEPAGES, id).await?;
        tx.commit().await.map_err(db_error("get_homepage"))?;
        Ok(homepage)
    }

    async fn create_homepage(&self, req: HomepageRequest) -> AppResult<HomepageResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("create_homepage"))?;
        ensure_link(&mut tx, req.link_id).await?;
        let sql = format!(
            "INSERT INTO homepages (id, link_id, thumbnail) VALUES ($1, $2, $3) RETURNING {}",
            HOMEPAGES.columns
        );
        let homepage = sqlx::query_as::<_, Homepage>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.link_id)
            .bind(req.thumbnail)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("create_homepage"))?;
        tx.commit().await.map_err(db_error("create_homepage"))?;
        Ok(Localized::new(homepage).into_response())
    }

    async fn update_homepage(&self, id: Uuid, req: HomepageRequest) -> AppResult<HomepageResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_homepage"))?;
        ensure_link(&mut tx, req.link_id).await?;
        let sql = format!(
            "UPDATE homepages SET link_id = $2, thumbnail = $3, {TOUCH} WHERE id = $1 RETURNING {}",
            HOMEPAGES.columns
        );
        let homepage = sqlx::query_as::<_, Homepage>(&sql)
            .bind(id)
            .bind(req.link_id)
            .bind(req.thumbnail)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("update_homepage"))?
            .ok_or_else(|| ApiError::not_found("Homepage", id))?;
        let response = assemble(&mut tx, &HOMEPAGES, homepage).await?;
        tx.commit().await.map_err(db_error("update_homepage"))?;
        Ok(response)
    }

    async fn delete_homepage(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(db_error("delete_homepage"))?;
        delete_parent(&mut conn, &HOMEPAGES, id).await
    }

    async fn list_homepage_contents(&self, homepage_id: Uuid) -> AppResult<Vec<HomepageContent>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_homepage_contents"))?;
        let contents = list_contents(&mut tx, &HOMEPAGES.content, homepage_id).await?;
        tx.commit().await.map_err(db_error("list_homepage_contents"))?;
        Ok(contents)
    }

    async fn get_homepage_content(&self, homepage_id: Uuid, language_id: Uuid) -> AppResult<HomepageContent> {
        let mut tx = self.pool.begin().await.map_err(db_error("get_homepage_content"))?;
        let content = get_content(&mut tx, &HOMEPAGES.content, homepage_id, language_id).await?;
        tx.commit().await.map_err(db_error("get_homepage_content"))?;
        Ok(content)
    }

    async fn attach_homepage_content(&self, homepage_id: Uuid, language_id: Uuid, fields: HomepageFields) -> AppResult<HomepageContent> {
        let t = &HOMEPAGES.content;
        let mut tx = self.pool.begin().await.map_err(db_error("attach_homepage_content"))?;
        let abbreviation = prepare_attach(&mut tx, t, homepage_id, language_id).await?;
        let sql = format!(
            r#"
            INSERT INTO homepage_contents (
                id, homepage_id, language_id, welcome_message, welcome_message_extended,
                explore_our_work, get_involved, important_links, ecosystem_links, blog, papers, read_more
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (homepage_id, language_id) DO NOTHING
            RETURNING {}
            "#,
            t.columns
        );
        let content = sqlx::query_as::<_, HomepageContent>(&sql)
            .bind(Uuid::new_v4())
            .bind(homepage_id)
            .bind(language_id)
            .bind(fields.welcome_message)
            .bind(fields.welcome_message_extended)
            .bind(fields.explore_our_work)
            .bind(fields.get_involved)
            .bind(fields.important_links)
            .bind(fields.ecosystem_links)
            .bind(fields.blog)
            .bind(fields.papers)
            .bind(fields.read_more)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("attach_homepage_content"))?
            .ok_or_else(|| ApiError::duplicate_content(t.kind, homepage_id, &abbreviation, language_id))?;
        tx.commit().await.map_err(db_error("attach_homepage_content"))?;
        Ok(content)
    }

    async fn update_homepage_content(&self, homepage_id: Uuid, language_id: Uuid, fields: HomepageFields) -> AppResult<HomepageContent> {
        let t = &HOMEPAGES.content;
        let mut tx = self.pool.begin().await.map_err(db_error("update_homepage_content"))?;
        ensure_exists(&mut tx, t.parent_table, t.kind.label(), homepage_id).await?;
        let sql = format!(
            r#"
            UPDATE homepage_contents
            SET welcome_message = $3,
                welcome_message_extended = $4,
                explore_our_work = $5,
                get_involved = $6,
                important_links = $7,
                ecosystem_links = $8,
                blog = $9,
                papers = $10,
                read_more = $11,
                {TOUCH}
            WHERE homepage_id = $1 AND language_id = $2
            RETURNING {}
            "#,
            t.columns
        );
        let content = sqlx::query_as::<_, HomepageContent>(&sql)
            .bind(homepage_id)
            .bind(language_id)
            .bind(fields.welcome_message)
            .bind(fields.welcome_message_extended)
            .bind(fields.explore_our_work)
            .bind(fields.get_involved)
            .bind(fields.important_links)
            .bind(fields.ecosystem_links)
            .bind(fields.blog)
            .bind(fields.papers)
            .bind(fields.read_more)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("update_homepage_content"))?
            .ok_or_else(|| ApiError::missing_content(t.kind, homepage_id, language_id))?;
        tx.commit().await.map_err(db_error("update_homepage_content"))?;
        Ok(content)
    }

    async fn remove_homepage_content(&self, homepage_id: Uuid, language_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("remove_homepage_content"))?;
        remove_content(&mut tx, &HOMEPAGES.content, homepage_id, language_id).await?;
        tx.commit().await.map_err(db_error("remove_homepage_content"))?;
        Ok(())
    }

    // --- Comments ---

    async fn list_comments(&self, target: CommentTarget) -> AppResult<Vec<Comment>> {
        let t = target_table(target);
        let column = match target {
            CommentTarget::Post(_) => "c.post_id",
            CommentTarget::Page(_) => "c.page_id",
        };
        let mut tx = self.pool.begin().await.map_err(db_error("list_comments"))?;
        ensure_exists(&mut tx, t.table, t.content.kind.label(), target.id()).await?;
        let comments = fetch_comments(&mut tx, column, target.id()).await?;
        tx.commit().await.map_err(db_error("list_comments"))?;
        Ok(comments)
    }

    async fn list_user_comments(&self, user_id: Uuid) -> AppResult<Vec<Comment>> {
        let mut tx = self.pool.begin().await.map_err(db_error("list_user_comments"))?;
        ensure_exists(&mut tx, "users", "User", user_id).await?;
        let comments = fetch_comments(&mut tx, "c.user_id", user_id).await?;
        tx.commit().await.map_err(db_error("list_user_comments"))?;
        Ok(comments)
    }

    async fn create_comment(&self, author_id: Uuid, target: CommentTarget, content: String) -> AppResult<Comment> {
        let t = target_table(target);
        let mut tx = self.pool.begin().await.map_err(db_error("create_comment"))?;
        ensure_exists(&mut tx, "users", "User", author_id).await?;

        // FOR SHARE keeps the flag stable until the insert commits.
        let sql = format!("SELECT comments_enabled FROM {} WHERE id = $1 FOR SHARE", t.table);
        let enabled: bool = sqlx::query_scalar(&sql)
            .bind(target.id())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("create_comment"))?
            .ok_or_else(|| ApiError::not_found(t.content.kind.label(), target.id()))?;
        if !enabled {
            return Err(ApiError::forbidden(format!(
                "Comments are disabled for {} {}",
                target.kind(),
                target.id()
            )));
        }
        let global: Option<bool> =
            sqlx::query_scalar("SELECT global_comments_enabled FROM global_settings FOR SHARE")
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("create_comment"))?;
        if global == Some(false) {
            return Err(ApiError::forbidden("Comments are disabled site-wide"));
        }

        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO comments (id, content, post_id, page_id, user_id) VALUES ($1, $2, $3, $4, $5)")
            .bind(id)
            .bind(content)
            .bind(target.post_id())
            .bind(target.page_id())
            .bind(author_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("create_comment"))?;
        let comment = fetch_comment(&mut tx, id).await?;
        tx.commit().await.map_err(db_error("create_comment"))?;
        Ok(comment)
    }

    async fn update_comment(&self, id: Uuid, author_id: Uuid, content: String) -> AppResult<Comment> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_comment"))?;
        let sql = format!("UPDATE comments SET content = $3, {TOUCH} WHERE id = $1 AND user_id = $2");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(author_id)
            .bind(content)
            .execute(&mut *tx)
            .await
            .map_err(db_error("update_comment"))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Comment", id));
        }
        let comment = fetch_comment(&mut tx, id).await?;
        tx.commit().await.map_err(db_error("update_comment"))?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid, author_id: Option<Uuid>) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_comment"))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Comment", id));
        }
        Ok(())
    }

    // --- Global settings ---

    async fn get_settings(&self) -> AppResult<GlobalSettings> {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM global_settings");
        sqlx::query_as::<_, GlobalSettings>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get_settings"))?
            .ok_or_else(|| ApiError::NotFound("Global settings not found".to_string()))
    }

    /// Upserts on the `singleton` key, so concurrent first saves still leave one row.
    async fn save_settings(&self, changes: SettingsChanges) -> AppResult<GlobalSettings> {
        let sql = format!(
            r#"
            INSERT INTO global_settings (
                id, session_duration_minutes, logo_url, website_name, global_comments_enabled,
                maintenance_mode, max_upload_size_mb, default_language, analytics_tracking_id,
                contact_email, meta_description, max_items_per_page, sso_auth_enabled,
                password_auth_enabled
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (singleton) DO UPDATE
            SET session_duration_minutes = EXCLUDED.session_duration_minutes,
                logo_url = EXCLUDED.logo_url,
                website_name = EXCLUDED.website_name,
                global_comments_enabled = EXCLUDED.global_comments_enabled,
                maintenance_mode = EXCLUDED.maintenance_mode,
                max_upload_size_mb = EXCLUDED.max_upload_size_mb,
                default_language = EXCLUDED.default_language,
                analytics_tracking_id = EXCLUDED.analytics_tracking_id,
                contact_email = EXCLUDED.contact_email,
                meta_description = EXCLUDED.meta_description,
                max_items_per_page = EXCLUDED.max_items_per_page,
                sso_auth_enabled = EXCLUDED.sso_auth_enabled,
                password_auth_enabled = EXCLUDED.password_auth_enabled,
                updated_at = GREATEST(NOW(), global_settings.updated_at + INTERVAL '1 microsecond')
            RETURNING {SETTINGS_COLUMNS}
            "#
        );
        sqlx::query_as::<_, GlobalSettings>(&sql)
            .bind(Uuid::new_v4())
            .bind(changes.session_duration_minutes)
            .bind(changes.logo_url)
            .bind(changes.website_name)
            .bind(changes.global_comments_enabled)
            .bind(changes.maintenance_mode)
            .bind(changes.max_upload_size_mb)
            .bind(changes.default_language)
            .bind(changes.analytics_tracking_id)
            .bind(changes.contact_email)
            .bind(changes.meta_description)
            .bind(changes.max_items_per_page)
            .bind(changes.sso_auth_enabled)
            .bind(changes.password_auth_enabled)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("save_settings"))
    }
}
