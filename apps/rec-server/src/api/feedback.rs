//! `GET /feedback-loops?windowHours=H` (spec §6, §4.8).

use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use rec_feedback::FeedbackLoopReport;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct FeedbackQuery {
    #[serde(default = "default_window_hours", rename = "windowHours")]
    window_hours: u64,
}

fn default_window_hours() -> u64 {
    24
}

pub async fn feedback_loops(
    State(state): State<AppState>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<FeedbackLoopReport>, ApiError> {
    let report = state.feedback.analyze(query.window_hours).await?;
    Ok(Json(report))
}
