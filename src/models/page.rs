use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{ArticleFields, ArticleMeta, required};
use crate::error::AppResult;
use crate::localized::{AggregateRoot, ContentPayload, LocalizedRecord, ParentKind};

/// Page
///
/// Language-agnostic part of a page. The text lives in `PageContent`, one row per language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Page {
    pub id: Uuid,
    pub link_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub comments_enabled: bool,
    /// Unpublished pages are only visible through `/admin`.
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageContent {
    pub id: Uuid,
    pub page_id: Uuid,
    pub language_id: Uuid,
    pub title: String,
    pub content: String,
    pub short_description: Option<String>,
    pub keywords: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PageRequest
///
/// Create and full-replace payload for `/admin/pages`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageRequest {
    pub link_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    #[validate(required(message = "Comments enabled flag is required"))]
    pub comments_enabled: Option<bool>,
    #[validate(required(message = "Published flag is required"))]
    pub published: Option<bool>,
}

impl PageRequest {
    pub fn into_meta(self) -> AppResult<ArticleMeta> {
        Ok(ArticleMeta {
            link_id: self.link_id,
            thumbnail: self.thumbnail,
            comments_enabled: required(
                self.comments_enabled,
                "commentsEnabled",
                "Comments enabled flag is required",
            )?,
            published: required(self.published, "published", "Published flag is required")?,
        })
    }
}

/// PageResponse
///
/// A page together with all of its language variants, sorted by language id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageResponse {
    pub id: Uuid,
    pub link_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub comments_enabled: bool,
    pub published: bool,
    pub contents: Vec<PageContent>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl LocalizedRecord for PageContent {
    fn id(&self) -> Uuid {
        self.id
    }
    fn parent_id(&self) -> Uuid {
        self.page_id
    }
    fn language_id(&self) -> Uuid {
        self.language_id
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl ContentPayload<PageContent> for ArticleFields {
    fn into_record(self, parent_id: Uuid, language_id: Uuid, now: DateTime<Utc>) -> PageContent {
        PageContent {
            id: Uuid::new_v4(),
            page_id: parent_id,
            language_id,
            title: self.title,
            content: self.content,
            short_description: self.short_description,
            keywords: self.keywords,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_to(self, record: &mut PageContent) {
        record.title = self.title;
        record.content = self.content;
        record.short_description = self.short_description;
        record.keywords = self.keywords;
    }
}

impl AggregateRoot for Page {
    type Content = PageContent;
    type Response = PageResponse;
    const KIND: ParentKind = ParentKind::Page;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assemble(self, contents: Vec<PageContent>) -> PageResponse {
        PageResponse {
            id: self.id,
            link_id: self.link_id,
            thumbnail: self.thumbnail,
            comments_enabled: self.comments_enabled,
            published: self.published,
            contents,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
