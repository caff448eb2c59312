//! Error handling for the stock lookup server
//!
//! Every failure reaches the caller as `{ "success": false, "error": ..., "code": ... }`.
//! Internal causes are logged, never returned.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::InputError;

use crate::services::StockError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many login attempts, retry in {minutes} minute(s)")]
    TooManyAttempts { minutes: u64 },

    #[error("Insufficient permissions")]
    Forbidden,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            code: code.to_string(),
            field: None,
        }
    }
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidToken | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            AppError::Unauthenticated => ErrorResponse::new("UNAUTHENTICATED", "Non autorisé"),
            AppError::InvalidToken => {
                ErrorResponse::new("INVALID_TOKEN", "Session invalide ou expirée")
            }
            AppError::InvalidCredentials => {
                ErrorResponse::new("INVALID_CREDENTIALS", "Email ou mot de passe incorrect")
            }
            AppError::TooManyAttempts { minutes } => ErrorResponse::new(
                "TOO_MANY_ATTEMPTS",
                format!(
                    "Trop de tentatives. Réessayez dans {} minute{}.",
                    minutes,
                    if *minutes > 1 { "s" } else { "" }
                ),
            ),
            AppError::Forbidden => ErrorResponse::new("FORBIDDEN", "Accès refusé"),
            AppError::Validation { field, message } => ErrorResponse {
                field: Some(field.clone()),
                ..ErrorResponse::new("VALIDATION_ERROR", message.clone())
            },
            AppError::NotFound(resource) => {
                ErrorResponse::new("NOT_FOUND", format!("{} non trouvé", resource))
            }
            AppError::Internal(_) | AppError::InternalError(_) => {
                ErrorResponse::new("INTERNAL_ERROR", "Erreur serveur")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::InvalidWarehouseCode(_) => {
                AppError::validation("code", "Code dépôt invalide")
            }
            InputError::MissingReference => {
                AppError::validation("reference", "Référence manquante")
            }
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "body".to_string());
        AppError::Validation {
            message: format!("Champ invalide : {}", field),
            field,
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NotFound(_) => AppError::NotFound("Dépôt".to_string()),
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
