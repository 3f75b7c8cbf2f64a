//! HTTP handlers for the sequence generation API.

pub mod digest;
pub mod health;
pub mod sequence;

pub use digest::{observation_digest, program_digest};
pub use health::{api_health, health_check};
pub use sequence::generate;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use seqgen_engine::SequenceResult;

use crate::error::{AppError, AppResult};

/// Unwrap a JSON body, reporting malformed input as a bad request.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Run an engine call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> SequenceResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Generation task failed: {}", e)))?;
    Ok(result?)
}
