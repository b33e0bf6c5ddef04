use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    ArticleFields, ArticleMeta, Author, BioFields, Comment, CommentTarget, GlobalSettings,
    HomepageContent, HomepageFields, HomepageRequest, HomepageResponse, Language, LanguageRequest,
    Link, LinkFields, LinkScope, NewUser, PageContent, PageResponse, PostContent, PostResponse,
    Role, RoleRequest, SettingsChanges, UserBio, UserChanges, UserResponse,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract shared by the Postgres and in-memory stores. Every method is
/// one unit of work: it either fully applies or leaves storage untouched, and reports
/// failures as `ApiError` (`NotFound`, `Conflict`, `Forbidden` or a 500 kind).
///
/// Inputs are the validated forms of the request payloads, so required values arrive
/// unwrapped. Localized content methods take the language key separately from the text;
/// the handler has already resolved and checked it.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Languages ---
    async fn list_languages(&self) -> AppResult<Vec<Language>>;
    async fn get_language(&self, id: Uuid) -> AppResult<Language>;
    async fn create_language(&self, req: LanguageRequest) -> AppResult<Language>;
    async fn update_language(&self, id: Uuid, req: LanguageRequest) -> AppResult<Language>;
    // Conflict while any content record or bio still references the language.
    async fn delete_language(&self, id: Uuid) -> AppResult<()>;

    // --- Links ---
    async fn list_links(&self, scope: Option<LinkScope>) -> AppResult<Vec<Link>>;
    async fn get_link(&self, id: Uuid) -> AppResult<Link>;
    async fn create_link(&self, link: LinkFields) -> AppResult<Link>;
    async fn update_link(&self, id: Uuid, link: LinkFields) -> AppResult<Link>;
    // Clears `link_id` on every page, post and homepage that pointed at the link.
    async fn delete_link(&self, id: Uuid) -> AppResult<()>;

    // --- Roles ---
    async fn list_roles(&self) -> AppResult<Vec<Role>>;
    async fn get_role(&self, id: Uuid) -> AppResult<Role>;
    async fn get_role_by_name(&self, name: &str) -> AppResult<Role>;
    async fn create_role(&self, req: RoleRequest) -> AppResult<Role>;
    async fn update_role(&self, id: Uuid, req: RoleRequest) -> AppResult<Role>;
    async fn delete_role(&self, id: Uuid) -> AppResult<()>;

    // --- Users ---
    async fn list_users(&self) -> AppResult<Vec<UserResponse>>;
    async fn get_user(&self, id: Uuid) -> AppResult<UserResponse>;
    async fn count_users(&self) -> AppResult<i64>;
    // New users always receive ROLE_USER.
    async fn create_user(&self, user: NewUser) -> AppResult<UserResponse>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<UserResponse>;
    async fn delete_user(&self, id: Uuid) -> AppResult<()>;
    // Idempotent: assigning a held role or revoking a missing one is not an error.
    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<UserResponse>;
    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<UserResponse>;

    // --- User bios (localized by language, owned by a user) ---
    async fn list_bios(&self, user_id: Uuid) -> AppResult<Vec<UserBio>>;
    async fn get_bio(&self, user_id: Uuid, language_id: Uuid) -> AppResult<UserBio>;
    async fn create_bio(&self, user_id: Uuid, language_id: Uuid, fields: BioFields) -> AppResult<UserBio>;
    async fn update_bio(&self, user_id: Uuid, language_id: Uuid, fields: BioFields) -> AppResult<UserBio>;
    async fn delete_bio(&self, user_id: Uuid, language_id: Uuid) -> AppResult<()>;

    // --- Pages ---
    // `published_only` hides drafts from anonymous readers.
    async fn list_pages(&self, published_only: bool) -> AppResult<Vec<PageResponse>>;
    async fn get_page(&self, id: Uuid) -> AppResult<PageResponse>;
    async fn create_page(&self, meta: ArticleMeta) -> AppResult<PageResponse>;
    async fn update_page(&self, id: Uuid, meta: ArticleMeta) -> AppResult<PageResponse>;
    async fn set_page_published(&self, id: Uuid, published: bool) -> AppResult<PageResponse>;
    async fn delete_page(&self, id: Uuid) -> AppResult<()>;
    async fn list_page_contents(&self, page_id: Uuid) -> AppResult<Vec<PageContent>>;
    async fn get_page_content(&self, page_id: Uuid, language_id: Uuid) -> AppResult<PageContent>;
    async fn attach_page_content(&self, page_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PageContent>;
    async fn update_page_content(&self, page_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PageContent>;
    async fn remove_page_content(&self, page_id: Uuid, language_id: Uuid) -> AppResult<()>;
    // Authors are listed by username.
    async fn list_page_authors(&self, page_id: Uuid) -> AppResult<Vec<Author>>;
    async fn list_pages_by_author(&self, user_id: Uuid, published_only: bool) -> AppResult<Vec<PageResponse>>;
    // Idempotent; returns the page's authors after the change.
    async fn assign_page_author(&self, page_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>>;
    // NotFound when the user is not an author of the page.
    async fn remove_page_author(&self, page_id: Uuid, user_id: Uuid) -> AppResult<()>;

    // --- Posts ---
    async fn list_posts(&self, published_only: bool) -> AppResult<Vec<PostResponse>>;
    async fn get_post(&self, id: Uuid) -> AppResult<PostResponse>;
    async fn create_post(&self, meta: ArticleMeta) -> AppResult<PostResponse>;
    async fn update_post(&self, id: Uuid, meta: ArticleMeta) -> AppResult<PostResponse>;
    async fn set_post_published(&self, id: Uuid, published: bool) -> AppResult<PostResponse>;
    async fn delete_post(&self, id: Uuid) -> AppResult<()>;
    async fn list_post_contents(&self, post_id: Uuid) -> AppResult<Vec<PostContent>>;
    async fn get_post_content(&self, post_id: Uuid, language_id: Uuid) -> AppResult<PostContent>;
    async fn attach_post_content(&self, post_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PostContent>;
    async fn update_post_content(&self, post_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PostContent>;
    async fn remove_post_content(&self, post_id: Uuid, language_id: Uuid) -> AppResult<()>;
    async fn list_post_authors(&self, post_id: Uuid) -> AppResult<Vec<Author>>;
    async fn list_posts_by_author(&self, user_id: Uuid, published_only: bool) -> AppResult<Vec<PostResponse>>;
    async fn assign_post_author(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>>;
    async fn remove_post_author(&self, post_id: Uuid, user_id: Uuid) -> AppResult<()>;

    // --- Homepages ---
    async fn list_homepages(&self) -> AppResult<Vec<HomepageResponse>>;
    async fn get_homepage(&self, id: Uuid) -> AppResult<HomepageResponse>;
    async fn create_homepage(&self, req: HomepageRequest) -> AppResult<HomepageResponse>;
    async fn update_homepage(&self, id: Uuid, req: HomepageRequest) -> AppResult<HomepageResponse>;
    async fn delete_homepage(&self, id: Uuid) -> AppResult<()>;
    async fn list_homepage_contents(&self, homepage_id: Uuid) -> AppResult<Vec<HomepageContent>>;
    async fn get_homepage_content(&self, homepage_id: Uuid, language_id: Uuid) -> AppResult<HomepageContent>;
    async fn attach_homepage_content(&self, homepage_id: Uuid, language_id: Uuid, fields: HomepageFields) -> AppResult<HomepageContent>;
    async fn update_homepage_content(&self, homepage_id: Uuid, language_id: Uuid, fields: HomepageFields) -> AppResult<HomepageContent>;
    async fn remove_homepage_content(&self, homepage_id: Uuid, language_id: Uuid) -> AppResult<()>;

    // --- Comments ---
    // Newest first.
    async fn list_comments(&self, target: CommentTarget) -> AppResult<Vec<Comment>>;
    async fn list_user_comments(&self, user_id: Uuid) -> AppResult<Vec<Comment>>;
    // Forbidden when the target, or the site as a whole, has comments disabled.
    async fn create_comment(&self, author_id: Uuid, target: CommentTarget, content: String) -> AppResult<Comment>;
    // Owner-Only: a comment owned by someone else is reported as NotFound.
    async fn update_comment(&self, id: Uuid, author_id: Uuid, content: String) -> AppResult<Comment>;
    // `author_id = None` is the admin override and deletes any comment.
    async fn delete_comment(&self, id: Uuid, author_id: Option<Uuid>) -> AppResult<()>;

    // --- Global settings (a singleton) ---
    // NotFound until the settings are saved once.
    async fn get_settings(&self) -> AppResult<GlobalSettings>;
    // Creates the singleton on first save, replaces it afterwards.
    async fn save_settings(&self, changes: SettingsChanges) -> AppResult<GlobalSettings>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
