//! `GET /healthz`, `GET /metrics` (spec §4.9).

use crate::app_state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub store_reachable: bool,
    pub bus_subscriber_count: usize,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthReport> {
    let store_reachable = state.store.list_dead_letters(1).is_ok();
    Json(HealthReport {
        status: if store_reachable { "ok" } else { "degraded" },
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store_reachable,
        bus_subscriber_count: state.bus.receiver_count(),
    })
}
