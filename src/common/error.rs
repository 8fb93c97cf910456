// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    // Single-field validation that doesn't come from a `Validate` derive
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("{entity} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("{entity} is in terminal status '{status}'")]
    TerminalState {
        entity: &'static str,
        status: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid token")]
    InvalidToken,

    // Anything the data-access layer reports (connection lost, timeout, bad row)
    #[error("Dependency error: {0}")]
    DependencyError(String),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidField { field, message: message.into() }
    }

    /// Stable machine-readable code so the presentation layer can pick its own message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => "validation_error",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::TerminalState { .. } => "terminal_state",
            AppError::Conflict(_) => "conflict",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidToken => "invalid_token",
            AppError::DependencyError(_) => "dependency_error",
            AppError::InternalServerError(_) => "internal_error",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Record".into()),
            other => AppError::DependencyError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        // A stored document that no longer matches its entity shape
        AppError::DependencyError(format!("malformed document: {}", e))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AppError::InvalidToken
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "code": code,
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidField { field, message } => {
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "code": code,
                    "details": { *field: [message] },
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidTransition { .. } | AppError::TerminalState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::DependencyError(e) => {
                tracing::error!("🔥 Data store failure: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::InternalServerError(e) => {
                tracing::error!("🔥 Internal server error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "An unexpected error occurred.".to_string(),
            StatusCode::SERVICE_UNAVAILABLE => "The data store is unavailable, try again.".to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({ "error": message, "code": code }));
        (status, body).into_response()
    }
}
