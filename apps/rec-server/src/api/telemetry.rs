//! `GET /telemetry/{conversion-funnel|item-trends|user-engagement}`
//! (spec §6), backed by the event store's aggregations (spec §4.2).

use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use rec_protocol::RecError;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct TelemetryQuery {
    from: Option<i64>,
    variant: Option<String>,
    #[serde(rename = "itemId")]
    item_id: Option<String>,
}

pub async fn telemetry(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<TelemetryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let from = query.from.unwrap_or_else(|| {
        chrono::Utc::now().timestamp_millis() - state.config.online_metric_window.as_millis() as i64
    });

    let value = match kind.as_str() {
        "conversion-funnel" => {
            let aggregate = state.store.aggregate_funnel_async(from, query.variant).await.map_err(RecError::from)?;
            serde_json::to_value(aggregate).map_err(|e| RecError::internal(e.to_string()))?
        }
        "item-trends" => {
            let aggregate = state.store.aggregate_item_trend_async(from, query.item_id).await.map_err(RecError::from)?;
            serde_json::to_value(aggregate).map_err(|e| RecError::internal(e.to_string()))?
        }
        "user-engagement" => {
            let aggregate = state.store.aggregate_user_engagement_async(from).await.map_err(RecError::from)?;
            serde_json::to_value(aggregate).map_err(|e| RecError::internal(e.to_string()))?
        }
        other => return Err(RecError::not_found(format!("no telemetry view `{other}`")).into()),
    };
    Ok(Json(value))
}
