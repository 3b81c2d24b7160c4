//! Per-request prediction provenance (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    pub item_id: String,
    pub score: f64,
}

/// Idempotently stored (keyed by `request_id`) record of a serving decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionTrace {
    pub request_id: String,
    pub user_id: String,
    pub variant: String,
    pub model_version: String,
    pub data_snapshot_id: String,
    pub pipeline_git_sha: String,
    pub container_image_digest: String,
    pub recommendations: Vec<ScoredItem>,
    pub latency_ms: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: String,
}
