use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LanguageScoped, not_blank, required};
use crate::error::AppResult;
use crate::localized::{ContentPayload, LocalizedRecord};

/// User
///
/// Row of the `users` table. Carries the bcrypt hash, so it is never serialized; the API
/// exposes `UserResponse` instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn into_response(self, roles: Vec<String>) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            title: self.title,
            affiliation: self.affiliation,
            thumbnail: self.thumbnail,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn author(&self) -> Author {
        Author {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            title: self.title.clone(),
            affiliation: self.affiliation.clone(),
            thumbnail: self.thumbnail.clone(),
        }
    }
}

/// Author
///
/// The public profile shown next to comments and on authored posts and pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    pub thumbnail: Option<String>,
}

/// UserResponse
///
/// Public view of a user with the names of its roles. Email and password never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    pub thumbnail: Option<String>,
    /// Sorted role names, e.g. `["ROLE_ADMIN", "ROLE_USER"]`.
    pub roles: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// UserRequest
///
/// Registration payload (`POST /users`). The password is hashed before it reaches a repository.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    pub thumbnail: Option<String>,
}

impl UserRequest {
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            title: self.title,
            affiliation: self.affiliation,
            thumbnail: self.thumbnail,
        }
    }
}

/// UpdateUserRequest
///
/// Partial update for `/admin/users/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Username cannot be blank"))]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Password cannot be blank"))]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl UpdateUserRequest {
    /// `password_hash` replaces the plain password, which is dropped here.
    pub fn into_changes(self, password_hash: Option<String>) -> UserChanges {
        UserChanges {
            username: self.username.map(|u| u.trim().to_string()),
            email: self.email.map(|e| e.trim().to_string()),
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            title: self.title,
            affiliation: self.affiliation,
            thumbnail: self.thumbnail,
        }
    }
}

/// A validated, hashed registration ready to insert.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    pub thumbnail: Option<String>,
}

/// Column changes for a partial user update; `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    pub thumbnail: Option<String>,
}

impl UserChanges {
    pub fn apply_to(self, user: &mut User) {
        if let Some(v) = self.username {
            user.username = v;
        }
        if let Some(v) = self.email {
            user.email = v;
        }
        if let Some(v) = self.password_hash {
            user.password_hash = v;
        }
        if self.first_name.is_some() {
            user.first_name = self.first_name;
        }
        if self.last_name.is_some() {
            user.last_name = self.last_name;
        }
        if self.title.is_some() {
            user.title = self.title;
        }
        if self.affiliation.is_some() {
            user.affiliation = self.affiliation;
        }
        if self.thumbnail.is_some() {
            user.thumbnail = self.thumbnail;
        }
    }
}

/// UserBio
///
/// A user's biography in one language. At most one per (user, language).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserBio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub language_id: Uuid,
    pub bio: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl LocalizedRecord for UserBio {
    fn id(&self) -> Uuid {
        self.id
    }
    fn parent_id(&self) -> Uuid {
        self.user_id
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

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BioFields {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Bio content is required"))]
    pub bio: String,
}

/// CreateUserBioRequest
///
/// Adds a biography in a language the user has none in yet.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateUserBioRequest {
    #[validate(required(message = "Language ID is required"))]
    pub language_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: BioFields,
}

impl CreateUserBioRequest {
    pub fn into_parts(self) -> AppResult<(Uuid, BioFields)> {
        let language_id = required(self.language_id, "languageId", "Language ID is required")?;
        Ok((language_id, self.fields))
    }
}

/// UserBioRequest
///
/// Rewrites an existing biography. `languageId` may only repeat the stored language.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserBioRequest {
    pub language_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: BioFields,
}

impl LanguageScoped for UserBioRequest {
    fn language_id(&self) -> Option<Uuid> {
        self.language_id
    }
}

impl ContentPayload<UserBio> for BioFields {
    fn into_record(self, parent_id: Uuid, language_id: Uuid, now: DateTime<Utc>) -> UserBio {
        UserBio {
            id: Uuid::new_v4(),
            user_id: parent_id,
            language_id,
            bio: self.bio,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_to(self, record: &mut UserBio) {
        record.bio = self.bio;
    }
}
