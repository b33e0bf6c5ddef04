use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LanguageScoped, not_blank, required};
use crate::error::AppResult;
use crate::localized::{AggregateRoot, ContentPayload, LocalizedRecord, ParentKind};

/// Homepage
///
/// Landing-page shell. Has no publish flag and takes no comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Homepage {
    pub id: Uuid,
    pub link_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// HomepageContent
///
/// The landing-page sections in one language. Only the welcome message is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HomepageContent {
    pub id: Uuid,
    pub homepage_id: Uuid,
    pub language_id: Uuid,
    pub welcome_message: String,
    pub welcome_message_extended: Option<String>,
    pub explore_our_work: Option<String>,
    pub get_involved: Option<String>,
    pub important_links: Option<String>,
    pub ecosystem_links: Option<String>,
    pub blog: Option<String>,
    pub papers: Option<String>,
    pub read_more: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HomepageRequest {
    pub link_id: Option<Uuid>,
    pub thumbnail: Option<String>,
}

/// HomepageFields
///
/// The landing-page sections of one language variant.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HomepageFields {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Welcome message is required"))]
    pub welcome_message: String,
    pub welcome_message_extended: Option<String>,
    pub explore_our_work: Option<String>,
    pub get_involved: Option<String>,
    pub important_links: Option<String>,
    pub ecosystem_links: Option<String>,
    pub blog: Option<String>,
    pub papers: Option<String>,
    pub read_more: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateHomepageContentRequest {
    #[validate(required(message = "Language ID is required"))]
    pub language_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: HomepageFields,
}

impl CreateHomepageContentRequest {
    pub fn into_parts(self) -> AppResult<(Uuid, HomepageFields)> {
        let language_id = required(self.language_id, "languageId", "Language ID is required")?;
        Ok((language_id, self.fields))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HomepageContentRequest {
    pub language_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: HomepageFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HomepageResponse {
    pub id: Uuid,
    pub link_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub contents: Vec<HomepageContent>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl LanguageScoped for HomepageContentRequest {
    fn language_id(&self) -> Option<Uuid> {
        self.language_id
    }
}

impl LocalizedRecord for HomepageContent {
    fn id(&self) -> Uuid {
        self.id
    }
    fn parent_id(&self) -> Uuid {
        self.homepage_id
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

impl ContentPayload<HomepageContent> for HomepageFields {
    fn into_record(self, parent_id: Uuid, language_id: Uuid, now: DateTime<Utc>) -> HomepageContent {
        HomepageContent {
            id: Uuid::new_v4(),
            homepage_id: parent_id,
            language_id,
            welcome_message: self.welcome_message,
            welcome_message_extended: self.welcome_message_extended,
            explore_our_work: self.explore_our_work,
            get_involved: self.get_involved,
            important_links: self.important_links,
            ecosystem_links: self.ecosystem_links,
            blog: self.blog,
            papers: self.papers,
            read_more: self.read_more,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_to(self, record: &mut HomepageContent) {
        record.welcome_message = self.welcome_message;
        record.welcome_message_extended = self.welcome_message_extended;
        record.explore_our_work = self.explore_our_work;
        record.get_involved = self.get_involved;
        record.important_links = self.important_links;
        record.ecosystem_links = self.ecosystem_links;
        record.blog = self.blog;
        record.papers = self.papers;
        record.read_more = self.read_more;
    }
}

impl AggregateRoot for Homepage {
    type Content = HomepageContent;
    type Response = HomepageResponse;
    const KIND: ParentKind = ParentKind::Homepage;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assemble(self, contents: Vec<HomepageContent>) -> HomepageResponse {
        HomepageResponse {
            id: self.id,
            link_id: self.link_id,
            thumbnail: self.thumbnail,
            contents,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
