//! Observation and program digest endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use seqgen_engine::{ObservationDigest, ObservationInput, ProgramDigest};

use super::{body, run_blocking};
use crate::error::AppResult;
use crate::result_ext::ResultExt;
use crate::state::AppState;

/// Summarize one observation.
///
/// POST /api/digest
pub async fn observation_digest(
    State(state): State<AppState>,
    payload: Result<Json<ObservationInput>, JsonRejection>,
) -> AppResult<Json<ObservationDigest>> {
    let input = body(payload)?;
    info!(observation_id = %input.observation_id, "Digest requested");

    let engine = state.engine.clone();
    let digest = run_blocking(move || engine.digest_static(&input))
        .await
        .log("computing observation digest")?;
    Ok(Json(digest))
}

/// Summarize a set of observations.
///
/// POST /api/program/digest
///
/// The body is a list of observation inputs. Any observation that cannot
/// be digested fails the whole request.
pub async fn program_digest(
    State(state): State<AppState>,
    payload: Result<Json<Vec<ObservationInput>>, JsonRejection>,
) -> AppResult<Json<ProgramDigest>> {
    let inputs = body(payload)?;
    info!(observations = inputs.len(), "Program digest requested");

    let engine = state.engine.clone();
    let digest = run_blocking(move || engine.program_digest(&inputs))
        .await
        .log("computing program digest")?;
    Ok(Json(digest))
}
