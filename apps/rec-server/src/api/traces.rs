//! `GET /traces/{requestId}` — trace document or 404 (spec §6).

use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use rec_protocol::{PredictionTrace, RecError};

pub async fn get_trace(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<PredictionTrace>, ApiError> {
    let trace = state.registry.get_trace_async(request_id.clone()).await?;
    trace
        .map(Json)
        .ok_or_else(|| RecError::not_found(format!("no trace for requestId `{request_id}`")).into())
}
