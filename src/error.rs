use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::localized::{ContentError, ParentKind};

/// FieldViolation
///
/// One rejected request field. `field` uses the camelCase name the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// ErrorResponse
///
/// Body returned for every non-2xx response produced by `ApiError`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ErrorResponse {
    /// Stable machine-readable kind, e.g. `not_found` or `validation_error`.
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldViolation>,
}

/// ApiError
///
/// The single error type returned by repositories and handlers. Each variant maps to
/// exactly one HTTP status; database and internal details are logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldViolation>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, ApiError>;

impl ApiError {
    /// `"{Entity} not found with id: {id}"`
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{entity} not found with id: {id}"))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    /// Raised when a parent already holds a content record for the language.
    pub fn duplicate_content(kind: ParentKind, parent_id: Uuid, abbreviation: &str, language_id: Uuid) -> Self {
        ApiError::Conflict(format!(
            "{} {parent_id} already has content for language {abbreviation} ({language_id})",
            kind.label()
        ))
    }

    pub fn missing_content(kind: ParentKind, parent_id: Uuid, language_id: Uuid) -> Self {
        ApiError::NotFound(format!(
            "{} content not found for {} {parent_id} and language {language_id}",
            kind.label(),
            kind.as_str()
        ))
    }

    /// Single-field validation failure raised outside of the derive-based checks.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldViolation {
            field: field.to_string(),
            message: message.to_string(),
        }])
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Database(_) | ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.kind().to_string();

        let (message, fields) = match self {
            ApiError::Validation(fields) => ("Validation failed".to_string(), fields),
            // Logged with operation context by the repository.
            ApiError::Database(_) => ("Internal server error".to_string(), Vec::new()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), Vec::new())
            }
            ApiError::Unauthorized => ("Authentication required".to_string(), Vec::new()),
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => (msg, Vec::new()),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                message,
                fields,
            }),
        )
            .into_response()
    }
}

// Constraint violations are client errors; everything else from the driver is a 500.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.is_unique_violation() {
                let constraint = db.constraint().unwrap_or("unique key");
                return ApiError::Conflict(format!(
                    "A record with the same value already exists ({constraint})"
                ));
            }
            if db.is_foreign_key_violation() {
                let constraint = db.constraint().unwrap_or("foreign key");
                return ApiError::Conflict(format!(
                    "The record is still referenced or references a missing record ({constraint})"
                ));
            }
        }
        ApiError::Database(err)
    }
}

// Nested payload structs are serde-flattened, so their fields are reported under their
// own names rather than behind the parent field.
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_violations(&errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
        ApiError::Validation(fields)
    }
}

fn collect_violations(errors: &ValidationErrors, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldViolation {
                    field: camel_case(field),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_violations(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_violations(inner, out);
                }
            }
        }
    }
}

// Context-free fallback; repositories use `duplicate_content` / `missing_content` when they
// can name the parent and language.
impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::DuplicateLanguage(_) => ApiError::Conflict(err.to_string()),
            ContentError::MissingLanguage(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {err}"))
    }
}

/// validator reports Rust field names; clients speak camelCase.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
