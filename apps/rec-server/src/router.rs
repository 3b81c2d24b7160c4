//! Route table, one use case per route (spec §6). Grounded in the
//! teacher's `RouterBuilder` + path-constant convention.

use crate::api;
use crate::app_state::AppState;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod paths {
    pub const RECOMMENDATIONS: &str = "/recommendations";
    pub const EXPERIMENT_SUMMARY: &str = "/experiments/{id}/summary";
    pub const FAIRNESS: &str = "/fairness";
    pub const FEEDBACK_LOOPS: &str = "/feedback-loops";
    pub const TELEMETRY: &str = "/telemetry/{kind}";
    pub const TRACE: &str = "/traces/{requestId}";
    pub const ADMIN_MODELS: &str = "/admin/models";
    pub const ADMIN_SWITCH_MODEL: &str = "/admin/switch-model";
    pub const ADMIN_DEAD_LETTERS: &str = "/admin/dead-letters";
    pub const HEALTHZ: &str = "/healthz";
    pub const METRICS: &str = "/metrics";
}

pub fn build(state: AppState, prometheus: PrometheusHandle) -> Router {
    Router::new()
        .route(paths::RECOMMENDATIONS, post(api::recommendations::recommend))
        .route(paths::EXPERIMENT_SUMMARY, get(api::experiments::summary))
        .route(paths::FAIRNESS, get(api::fairness::fairness))
        .route(paths::FEEDBACK_LOOPS, get(api::feedback::feedback_loops))
        .route(paths::TELEMETRY, get(api::telemetry::telemetry))
        .route(paths::TRACE, get(api::traces::get_trace))
        .route(paths::ADMIN_MODELS, get(api::admin::list_models))
        .route(paths::ADMIN_SWITCH_MODEL, post(api::admin::switch_model))
        .route(paths::ADMIN_DEAD_LETTERS, get(api::admin::list_dead_letters))
        .route(paths::HEALTHZ, get(api::health::healthz))
        .route(paths::METRICS, get(move || render_metrics(prometheus.clone())))
        .layer(middleware::from_fn(count_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn render_metrics(handle: PrometheusHandle) -> String {
    handle.render()
}

/// Request/error counters labeled by route (spec §4.9). `route` comes
/// from axum's matched path, mapped back to our own static constants so
/// templated segments (`{id}`) stay low cardinality without per-request
/// allocation.
fn known_route(matched: &str) -> &'static str {
    match matched {
        paths::RECOMMENDATIONS => paths::RECOMMENDATIONS,
        paths::EXPERIMENT_SUMMARY => paths::EXPERIMENT_SUMMARY,
        paths::FAIRNESS => paths::FAIRNESS,
        paths::FEEDBACK_LOOPS => paths::FEEDBACK_LOOPS,
        paths::TELEMETRY => paths::TELEMETRY,
        paths::TRACE => paths::TRACE,
        paths::ADMIN_MODELS => paths::ADMIN_MODELS,
        paths::ADMIN_SWITCH_MODEL => paths::ADMIN_SWITCH_MODEL,
        paths::ADMIN_DEAD_LETTERS => paths::ADMIN_DEAD_LETTERS,
        paths::HEALTHZ => paths::HEALTHZ,
        paths::METRICS => paths::METRICS,
        _ => "unmatched",
    }
}

async fn count_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| known_route(p.as_str()))
        .unwrap_or("unmatched");
    crate::metrics::record_request(route);
    let response = next.run(request).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        let category = if response.status().is_client_error() { "client" } else { "server" };
        crate::metrics::record_error(route, category);
    }
    response
}
