use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{not_blank, required};
use crate::error::AppResult;

/// LinkScope
///
/// Whether a link points inside the site or elsewhere. Stored as the Postgres enum `link_scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "link_scope", rename_all = "UPPERCASE")]
#[ts(export)]
pub enum LinkScope {
    Internal,
    External,
}

/// Link
///
/// Navigation target referenced by pages, posts and homepages. Deleting a link clears
/// those references instead of deleting the referrers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Link {
    pub id: Uuid,
    pub url: String,
    pub name: Option<String>,
    pub font_awesome_icon: Option<String>,
    pub mdi_icon: Option<String>,
    // `type` is reserved in Rust.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub link_type: Option<String>,
    pub scope: LinkScope,
}

/// LinkRequest
///
/// Create and full-replace payload for `/admin/links`. `link` is accepted as an alias of `url`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LinkRequest {
    #[serde(default, alias = "link")]
    #[validate(custom(function = "not_blank", message = "Link URL is required"))]
    pub url: String,
    pub name: Option<String>,
    pub font_awesome_icon: Option<String>,
    pub mdi_icon: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    #[validate(required(message = "Link scope is required"))]
    pub scope: Option<LinkScope>,
}

impl LinkRequest {
    pub fn into_fields(self) -> AppResult<LinkFields> {
        Ok(LinkFields {
            scope: required(self.scope, "scope", "Link scope is required")?,
            url: self.url,
            name: self.name,
            font_awesome_icon: self.font_awesome_icon,
            mdi_icon: self.mdi_icon,
            link_type: self.link_type,
        })
    }
}

/// A validated link, as handed to a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkFields {
    pub url: String,
    pub name: Option<String>,
    pub font_awesome_icon: Option<String>,
    pub mdi_icon: Option<String>,
    pub link_type: Option<String>,
    pub scope: LinkScope,
}

impl LinkFields {
    pub fn new(url: impl Into<String>, scope: LinkScope) -> Self {
        Self {
            url: url.into(),
            name: None,
            font_awesome_icon: None,
            mdi_icon: None,
            link_type: None,
            scope,
        }
    }
}
