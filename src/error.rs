//! Custom error types and handling
//!
//! This module defines the engine's error taxonomy and its mappings to both
//! the realtime protocol (`error` event codes) and HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::constants::error_codes;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Validation errors: rejected immediately, no state change
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown contest code: {0}")]
    UnknownContest(String),

    // Lifecycle errors
    #[error("Contest has ended")]
    ContestEnded,

    #[error("Invalid contest state transition: {0}")]
    InvalidTransition(String),

    #[error("Participant has not joined this contest")]
    NotJoined,

    #[error("Only the contest host may do that")]
    NotHost,

    // Judge errors: surfaced as failed submissions, never retried
    #[error("Judge error: {0}")]
    Judge(String),

    #[error("Judge call exceeded its deadline")]
    JudgeTimeout,

    // Store errors
    #[error("Database error: {0}")]
    Database(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wire code carried in the `error` protocol event
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::InvalidInput(_) => error_codes::VALIDATION,
            Self::UnknownContest(_) => error_codes::UNKNOWN_CONTEST,
            Self::ContestEnded => error_codes::CONTEST_ENDED,
            Self::InvalidTransition(_) => error_codes::INVALID_TRANSITION,
            Self::NotJoined => error_codes::NOT_JOINED,
            Self::NotHost => error_codes::NOT_HOST,
            Self::Judge(_) => error_codes::JUDGE_ERROR,
            Self::JudgeTimeout => error_codes::JUDGE_TIMEOUT,
            Self::Database(_) => error_codes::DATABASE,
            Self::Internal(_) => error_codes::INTERNAL,
        }
    }

    /// HTTP status code for the REST surface
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::UnknownContest(_) => StatusCode::NOT_FOUND,
            Self::ContestEnded | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::NotJoined | Self::NotHost => StatusCode::FORBIDDEN,
            Self::Judge(_) | Self::JudgeTimeout => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in response
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internal errors but don't expose details to clients
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "A database error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
