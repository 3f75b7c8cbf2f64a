//! Sequence generation endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use seqgen_engine::{ExecutionConfig, ObservationInput};

use super::{body, run_blocking};
use crate::error::AppResult;
use crate::result_ext::ResultExt;
use crate::state::AppState;

/// Query parameters for sequence generation.
#[derive(Debug, Default, Deserialize)]
pub struct SequenceQuery {
    /// Maximum number of future atoms to return.
    pub limit: Option<usize>,
}

/// Generate the next atom and possible future for an observation.
///
/// POST /api/sequence?limit=N
///
/// The body is the observation's configuration, ITC result and execution
/// history. Both acquisition and science sequences are returned; the
/// acquisition is null for observations that do not acquire.
pub async fn generate(
    State(state): State<AppState>,
    Query(query): Query<SequenceQuery>,
    payload: Result<Json<ObservationInput>, JsonRejection>,
) -> AppResult<Json<ExecutionConfig>> {
    let input = body(payload)?;
    info!(
        observation_id = %input.observation_id,
        limit = ?query.limit,
        steps_recorded = input.history.atoms.iter().map(|a| a.steps.len()).sum::<usize>(),
        "Sequence requested"
    );

    let engine = state.engine.clone();
    let config = run_blocking(move || engine.generate_static(&input, query.limit))
        .await
        .log("generating sequence")?;

    debug!(
        science_future = config.science.possible_future.len(),
        science_state = %config.science.state,
        "Sequence generated"
    );
    Ok(Json(config))
}
