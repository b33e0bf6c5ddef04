use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{Author, not_blank};
use crate::error::{ApiError, AppResult};
use crate::localized::ParentKind;

/// CommentTarget
///
/// The one parent a comment belongs to. Serialized as `{"type": "post", "id": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
#[ts(export)]
pub enum CommentTarget {
    Post(Uuid),
    Page(Uuid),
}

impl CommentTarget {
    /// Builds the target from the nullable `post_id` / `page_id` pair. Exactly one must be set.
    pub fn from_columns(post_id: Option<Uuid>, page_id: Option<Uuid>) -> AppResult<Self> {
        match (post_id, page_id) {
            (Some(post), None) => Ok(CommentTarget::Post(post)),
            (None, Some(page)) => Ok(CommentTarget::Page(page)),
            (Some(_), Some(_)) => Err(ApiError::Conflict(
                "A comment must reference either a post or a page, not both".to_string(),
            )),
            (None, None) => Err(ApiError::Conflict(
                "A comment must reference a post or a page".to_string(),
            )),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            CommentTarget::Post(id) | CommentTarget::Page(id) => *id,
        }
    }

    pub fn kind(&self) -> ParentKind {
        match self {
            CommentTarget::Post(_) => ParentKind::Post,
            CommentTarget::Page(_) => ParentKind::Page,
        }
    }

    pub fn post_id(&self) -> Option<Uuid> {
        match self {
            CommentTarget::Post(id) => Some(*id),
            CommentTarget::Page(_) => None,
        }
    }

    pub fn page_id(&self) -> Option<Uuid> {
        match self {
            CommentTarget::Page(id) => Some(*id),
            CommentTarget::Post(_) => None,
        }
    }
}

/// Comment
///
/// A user's comment on a post or a page, with the author's public profile joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub target: CommentTarget,
    pub author: Author,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Raw `comments` row joined with the author's profile columns from `users`.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub content: String,
    pub post_id: Option<Uuid>,
    pub page_id: Option<Uuid>,
    pub user_id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = ApiError;

    fn try_from(row: CommentRow) -> AppResult<Self> {
        let target = CommentTarget::from_columns(row.post_id, row.page_id).map_err(|_| {
            ApiError::Internal(format!("comment {} has an invalid target", row.id))
        })?;
        Ok(Comment {
            id: row.id,
            content: row.content,
            target,
            author: Author {
                id: row.user_id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                title: row.title,
                affiliation: row.affiliation,
                thumbnail: row.thumbnail,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// CreateCommentRequest
///
/// Exactly one of `postId` / `pageId` must be given.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCommentRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Comment content is required"))]
    pub content: String,
    pub post_id: Option<Uuid>,
    pub page_id: Option<Uuid>,
}

impl CreateCommentRequest {
    pub fn target(&self) -> AppResult<CommentTarget> {
        CommentTarget::from_columns(self.post_id, self.page_id)
    }
}

/// CommentRequest
///
/// Edits the text of an existing comment; the target cannot change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Comment content is required"))]
    pub content: String,
}
