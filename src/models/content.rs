use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LanguageScoped, not_blank, required};
use crate::error::AppResult;

/// ArticleFields
///
/// The translatable text of a page or a post in one language.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleFields {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Content is required"))]
    pub content: String,
    pub short_description: Option<String>,
    pub keywords: Option<String>,
}

/// CreateArticleContentRequest
///
/// Attaches a new language variant to a page or a post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateArticleContentRequest {
    #[validate(required(message = "Language ID is required"))]
    pub language_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: ArticleFields,
}

impl CreateArticleContentRequest {
    pub fn into_parts(self) -> AppResult<(Uuid, ArticleFields)> {
        let language_id = required(self.language_id, "languageId", "Language ID is required")?;
        Ok((language_id, self.fields))
    }
}

/// ArticleContentRequest
///
/// Replaces the text of an existing language variant. `languageId` may be repeated but
/// never changed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleContentRequest {
    pub language_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: ArticleFields,
}

impl LanguageScoped for ArticleContentRequest {
    fn language_id(&self) -> Option<Uuid> {
        self.language_id
    }
}

/// Validated page or post settings, as handed to a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleMeta {
    pub link_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub comments_enabled: bool,
    pub published: bool,
}
