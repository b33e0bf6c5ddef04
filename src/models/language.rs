use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::not_blank;

/// Language
///
/// Shared reference data. Content records and user bios point at a language but never own it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Language {
    pub id: Uuid,
    pub name: String,
    /// Unique short code, e.g. `EN`. Used in conflict messages.
    pub abbreviation: String,
    pub font_awesome_icon: String,
    pub mdi_icon: String,
}

/// LanguageRequest
///
/// Create and full-replace payload for `/admin/languages`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LanguageRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Language name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Language abbreviation is required"))]
    pub abbreviation: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Font Awesome icon is required"))]
    pub font_awesome_icon: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "MDI icon is required"))]
    pub mdi_icon: String,
}
