// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized request")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Refresh token is expired or used")]
    TokenExpiredOrReused,

    #[error("Invalid user credentials")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Request body is too large")]
    PayloadTooLarge,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized
            | AppError::InvalidToken
            | AppError::TokenExpiredOrReused
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code placed in the `errors` list.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "validation_error",
            AppError::Upload(_) => "upload_error",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::TokenExpiredOrReused => "token_expired_or_reused",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::PayloadTooLarge => "payload_too_large",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();
        AppError::BadRequest(format!("Invalid value for: {}", fields.join(", ")))
    }
}

/// JSON error envelope
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status_code: u16,
    message: String,
    success: bool,
    errors: Vec<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures are logged in full but reported generically.
        let message = match &self {
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                "Something went wrong".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            status_code: status.as_u16(),
            message,
            success: false,
            errors: vec![self.code()],
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
