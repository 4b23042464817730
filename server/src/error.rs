//! Error types for the Tora server
//!
//! All errors use thiserror for structured error handling.
//! Every variant maps onto an HTTP status when it reaches the API layer.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// A single field-level problem found while validating a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Validation failed: {}", describe_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("Illustration integration is not configured")]
    IllustrationUnavailable,

    #[error("Upstream error: {0}")]
    Upstream(String),
}

fn describe_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    pub fn curriculum_not_found(id: i64) -> Self {
        AppError::NotFound {
            entity: "Curriculum",
            id,
        }
    }

    pub fn section_not_found(id: i64) -> Self {
        AppError::NotFound {
            entity: "Section",
            id,
        }
    }

    pub fn item_not_found(id: i64) -> Self {
        AppError::NotFound { entity: "Item", id }
    }

    /// Shorthand for a validation error with a single issue
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![ValidationIssue::new(path, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::IllustrationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::invalid("id", rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody<T: Serialize> {
    error: T,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::Validation(issues) => {
                (status, Json(ErrorBody { error: issues })).into_response()
            }
            AppError::NotFound { .. }
            | AppError::IllustrationUnavailable
            | AppError::Upstream(_)
            | AppError::Http(_) => {
                tracing::warn!("Request failed: {}", self);
                (status, Json(ErrorBody { error: self.to_string() })).into_response()
            }
            other => {
                tracing::error!("Internal error: {}", other);
                (
                    status,
                    Json(ErrorBody {
                        error: "Internal server error",
                    }),
                )
                    .into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
