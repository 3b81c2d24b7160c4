//! `GET /admin/models`, `POST /admin/switch-model`, `GET
//! /admin/dead-letters` — admin key required (spec §4.9, §6; the
//! dead-letter route is a SPEC_FULL §4 supplement).

use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use rec_protocol::{ModelArtifact, RecError, ServingState, ServingTarget};
use rec_store::DeadLetter;
use serde::Deserialize;

const ADMIN_KEY_HEADER: &str = "x-admin-api-key";

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), RecError> {
    let provided = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
    if state.is_admin_authorized(provided) {
        Ok(())
    } else {
        Err(RecError::unauthorized("missing or invalid admin api key"))
    }
}

pub async fn list_models(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ModelArtifact>>, ApiError> {
    require_admin(&state, &headers)?;
    let models = state.registry.list_models_async().await?;
    Ok(Json(models))
}

#[derive(Deserialize)]
pub struct SwitchModelRequest {
    pub version: String,
    pub target: String,
}

pub async fn switch_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SwitchModelRequest>,
) -> Result<Json<ServingState>, ApiError> {
    require_admin(&state, &headers)?;
    let target = ServingTarget::parse(&body.target)
        .ok_or_else(|| RecError::invalid_target(format!("unknown target `{}`", body.target)))?;
    let now = chrono::Utc::now().to_rfc3339();
    let state_doc = state.registry.set_serving_version_async(body.version, target, now).await?;
    Ok(Json(state_doc))
}

#[derive(Deserialize)]
pub struct DeadLetterQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list_dead_letters(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DeadLetterQuery>,
) -> Result<Json<Vec<DeadLetter>>, ApiError> {
    require_admin(&state, &headers)?;
    let letters = state.store.list_dead_letters(query.limit).map_err(RecError::from)?;
    Ok(Json(letters))
}
