use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{not_blank, required};
use crate::error::AppResult;

/// GlobalSettings
///
/// Site-wide configuration. There is at most one row; it does not exist until an
/// administrator saves the settings for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GlobalSettings {
    pub id: Uuid,
    pub session_duration_minutes: i32,
    pub logo_url: Option<String>,
    pub website_name: String,
    /// When off, no post or page accepts new comments regardless of its own flag.
    pub global_comments_enabled: bool,
    pub maintenance_mode: bool,
    pub max_upload_size_mb: i32,
    pub default_language: String,
    pub analytics_tracking_id: Option<String>,
    pub contact_email: Option<String>,
    pub meta_description: Option<String>,
    pub max_items_per_page: i32,
    pub sso_auth_enabled: bool,
    pub password_auth_enabled: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// GlobalSettingsRequest
///
/// Full replacement of the settings for `PUT /admin/settings`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GlobalSettingsRequest {
    #[validate(
        required(message = "Session duration is required"),
        range(min = 1, message = "Session duration must be positive")
    )]
    pub session_duration_minutes: Option<i32>,
    pub logo_url: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Website name is required"))]
    pub website_name: String,
    #[validate(required(message = "Global comments flag is required"))]
    pub global_comments_enabled: Option<bool>,
    #[validate(required(message = "Maintenance mode flag is required"))]
    pub maintenance_mode: Option<bool>,
    #[validate(
        required(message = "Maximum upload size is required"),
        range(min = 1, message = "Maximum upload size must be positive")
    )]
    pub max_upload_size_mb: Option<i32>,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Default language is required"))]
    pub default_language: String,
    pub analytics_tracking_id: Option<String>,
    #[validate(email(message = "Contact email must be a valid address"))]
    pub contact_email: Option<String>,
    pub meta_description: Option<String>,
    #[validate(
        required(message = "Maximum items per page is required"),
        range(min = 1, message = "Maximum items per page must be positive")
    )]
    pub max_items_per_page: Option<i32>,
    #[validate(required(message = "SSO flag is required"))]
    pub sso_auth_enabled: Option<bool>,
    #[validate(required(message = "Password authentication flag is required"))]
    pub password_auth_enabled: Option<bool>,
}

impl GlobalSettingsRequest {
    pub fn into_changes(self) -> AppResult<SettingsChanges> {
        Ok(SettingsChanges {
            session_duration_minutes: required(
                self.session_duration_minutes,
                "sessionDurationMinutes",
                "Session duration is required",
            )?,
            logo_url: self.logo_url,
            website_name: self.website_name,
            global_comments_enabled: required(
                self.global_comments_enabled,
                "globalCommentsEnabled",
                "Global comments flag is required",
            )?,
            maintenance_mode: required(
                self.maintenance_mode,
                "maintenanceMode",
                "Maintenance mode flag is required",
            )?,
            max_upload_size_mb: required(
                self.max_upload_size_mb,
                "maxUploadSizeMb",
                "Maximum upload size is required",
            )?,
            default_language: self.default_language,
            analytics_tracking_id: self.analytics_tracking_id,
            contact_email: self.contact_email,
            meta_description: self.meta_description,
            max_items_per_page: required(
                self.max_items_per_page,
                "maxItemsPerPage",
                "Maximum items per page is required",
            )?,
            sso_auth_enabled: required(self.sso_auth_enabled, "ssoAuthEnabled", "SSO flag is required")?,
            password_auth_enabled: required(
                self.password_auth_enabled,
                "passwordAuthEnabled",
                "Password authentication flag is required",
            )?,
        })
    }
}

/// Validated settings, as handed to a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsChanges {
    pub session_duration_minutes: i32,
    pub logo_url: Option<String>,
    pub website_name: String,
    pub global_comments_enabled: bool,
    pub maintenance_mode: bool,
    pub max_upload_size_mb: i32,
    pub default_language: String,
    pub analytics_tracking_id: Option<String>,
    pub contact_email: Option<String>,
    pub meta_description: Option<String>,
    pub max_items_per_page: i32,
    pub sso_auth_enabled: bool,
    pub password_auth_enabled: bool,
}

impl SettingsChanges {
    pub fn into_settings(self, id: Uuid, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> GlobalSettings {
        GlobalSettings {
            id,
            session_duration_minutes: self.session_duration_minutes,
            logo_url: self.logo_url,
            website_name: self.website_name,
            global_comments_enabled: self.global_comments_enabled,
            maintenance_mode: self.maintenance_mode,
            max_upload_size_mb: self.max_upload_size_mb,
            default_language: self.default_language,
            analytics_tracking_id: self.analytics_tracking_id,
            contact_email: self.contact_email,
            meta_description: self.meta_description,
            max_items_per_page: self.max_items_per_page,
            sso_auth_enabled: self.sso_auth_enabled,
            password_auth_enabled: self.password_auth_enabled,
            created_at,
            updated_at,
        }
    }
}
