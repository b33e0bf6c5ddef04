use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::not_blank;

/// Names of the roles seeded by the initial migration.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_EDITOR: &str = "ROLE_EDITOR";
pub const ROLE_MODERATOR: &str = "ROLE_MODERATOR";

pub const SEEDED_ROLES: [&str; 4] = [ROLE_ADMIN, ROLE_USER, ROLE_EDITOR, ROLE_MODERATOR];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoleRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Role name cannot be blank"))]
    pub name: String,
}
