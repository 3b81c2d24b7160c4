//! `GET /experiments/{id}/summary?windowHours=H` — only `rec-engine` is
//! defined (spec §6).

use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use rec_experiments::ExperimentSummary;
use rec_protocol::RecError;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_window_hours", rename = "windowHours")]
    window_hours: u64,
}

fn default_window_hours() -> u64 {
    24
}

pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ExperimentSummary>, ApiError> {
    if id != "rec-engine" {
        return Err(RecError::not_found(format!("no experiment `{id}`")).into());
    }
    let serving_state = state.registry.get_serving_state_async().await?;
    let summary = state
        .experiments
        .summarize(query.window_hours, serving_state.control_version, serving_state.treatment_version)
        .await?;
    Ok(Json(summary))
}
