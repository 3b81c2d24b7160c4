//! `POST /recommendations` (spec §6).

use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::State;
use axum::Json;
use rec_protocol::{ErrorCategory, RecError};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub user_id: String,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItemView {
    pub item_id: String,
    pub score: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub request_id: String,
    pub variant: String,
    pub model_version: String,
    pub data_snapshot_id: String,
    pub recommendations: Vec<ScoredItemView>,
}

pub async fn recommend(
    State(state): State<AppState>,
    Json(body): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    if body.user_id.trim().is_empty() {
        return Err(RecError::with_code(ErrorCategory::Validation, "userId_required", "userId is required").into());
    }
    let limit = body.limit.unwrap_or(10).max(1) as usize;
    let start = std::time::Instant::now();
    let result = state
        .serving
        .recommend(&body.user_id, limit, None)
        .await
        .map_err(|err| {
            if err.category == ErrorCategory::NotFound {
                err
            } else {
                RecError::with_code(ErrorCategory::Internal, "prediction_failed", err.message)
            }
        })?;
    crate::metrics::record_prediction_latency(result.variant.as_str(), start.elapsed().as_secs_f64() * 1000.0);

    Ok(Json(RecommendResponse {
        request_id: result.request_id,
        variant: result.variant.as_str().to_string(),
        model_version: result.model_version,
        data_snapshot_id: result.data_snapshot_id,
        recommendations: result
            .recommendations
            .into_iter()
            .map(|r| ScoredItemView { item_id: r.item_id, score: r.score })
            .collect(),
    }))
}
