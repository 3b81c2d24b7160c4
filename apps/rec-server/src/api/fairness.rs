//! `GET /fairness?windowHours=H` (spec §6, §4.7).

use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use rec_fairness::FairnessComparison;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct FairnessQuery {
    #[serde(default = "default_window_hours", rename = "windowHours")]
    window_hours: u64,
}

fn default_window_hours() -> u64 {
    24
}

pub async fn fairness(
    State(state): State<AppState>,
    Query(query): Query<FairnessQuery>,
) -> Result<Json<FairnessComparison>, ApiError> {
    let comparison = state.fairness.evaluate_fairness(query.window_hours).await?;
    Ok(Json(comparison))
}
