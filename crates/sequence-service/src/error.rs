//! Error types for the sequence generation service.
//!
//! `AppError` implements `IntoResponse` so handlers can return engine
//! failures directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use seqgen_engine::SequenceError;

/// Application-level errors for the service.
#[derive(Error, Debug)]
pub enum AppError {
    /// Sequence engine error
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Sequence(SequenceError::ExternalService { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Sequence(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Sequence(e) => {
                tracing::warn!(
                    error = %e,
                    kind = e.kind(),
                    observation_id = %e.observation_id(),
                    "Sequence generation failed"
                );
                e.to_string()
            }
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                msg.clone()
            }
            AppError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                msg.clone()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
