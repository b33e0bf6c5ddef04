//! Request, response and row types for every entity the API exposes.
//!
//! Rows derive `FromRow` and map one-to-one onto the tables in `migrations/`. Request
//! payloads derive `Validate`; handlers reject them before they reach a repository.

use uuid::Uuid;
use validator::ValidationError;

use crate::error::{ApiError, AppResult};

pub mod comment;
pub mod content;
pub mod homepage;
pub mod language;
pub mod link;
pub mod page;
pub mod post;
pub mod role;
pub mod settings;
pub mod user;

pub use comment::{Comment, CommentRequest, CommentRow, CommentTarget, CreateCommentRequest};
pub use content::{ArticleContentRequest, ArticleFields, ArticleMeta, CreateArticleContentRequest};
pub use homepage::{
    CreateHomepageContentRequest, Homepage, HomepageContent, HomepageContentRequest,
    HomepageFields, HomepageRequest, HomepageResponse,
};
pub use language::{Language, LanguageRequest};
pub use link::{Link, LinkFields, LinkRequest, LinkScope};
pub use page::{Page, PageContent, PageRequest, PageResponse};
pub use post::{Post, PostContent, PostRequest, PostResponse};
pub use role::{Role, RoleRequest};
pub use settings::{GlobalSettings, GlobalSettingsRequest, SettingsChanges};
pub use user::{
    Author, BioFields, CreateUserBioRequest, NewUser, UpdateUserRequest, User, UserBio,
    UserBioRequest, UserChanges, UserRequest, UserResponse,
};

/// Rejects empty and whitespace-only strings. The message comes from the field attribute.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

/// Unwraps a field that a `required` validator has already checked.
pub(crate) fn required<T>(value: Option<T>, field: &str, message: &str) -> AppResult<T> {
    value.ok_or_else(|| ApiError::invalid_field(field, message))
}

/// Update payloads that may repeat the language key of a localized record, but never
/// change it.
pub trait LanguageScoped {
    fn language_id(&self) -> Option<Uuid>;

    fn ensure_language(&self, expected: Uuid) -> AppResult<()> {
        match self.language_id() {
            Some(given) if given != expected => Err(ApiError::Conflict(format!(
                "Content language cannot be changed from {expected} to {given}; delete and recreate the content instead"
            ))),
            _ => Ok(()),
        }
    }
}
