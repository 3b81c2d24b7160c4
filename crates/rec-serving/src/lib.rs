//! C5 — Serving Engine: the six-step `recommend` contract of spec §4.5,
//! built on the variant assigner (C3, [`variant`]) and the registry (C2).

mod scoring;
mod variant;

pub use variant::{assign_variant, Variant};

use rec_events::Bus;
use rec_protocol::event::RecommendPayload;
use rec_protocol::trace::{PredictionTrace, ScoredItem};
use rec_protocol::{RawEvent, RecError};
use rec_registry::Registry;
use rec_store::EventStore;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
pub struct RecommendResult {
    pub request_id: String,
    pub variant: Variant,
    pub model_version: String,
    pub data_snapshot_id: String,
    pub recommendations: Vec<ScoredItem>,
}

pub struct ServingEngine {
    registry: Arc<Registry>,
    store: Arc<EventStore>,
    bus: Arc<Bus>,
    pipeline_git_sha: String,
    container_image_digest: String,
}

impl ServingEngine {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<EventStore>,
        bus: Arc<Bus>,
        pipeline_git_sha: String,
        container_image_digest: String,
    ) -> Self {
        ServingEngine {
            registry,
            store,
            bus,
            pipeline_git_sha,
            container_image_digest,
        }
    }

    /// Steps 1-4 can fail with `prediction_failed`-shaped errors; steps 5
    /// and 6 (trace persist, event emission) are logged-only failures that
    /// never reach the caller (spec §4.5).
    pub async fn recommend(
        &self,
        user_id: &str,
        n: usize,
        request_id: Option<String>,
    ) -> Result<RecommendResult, RecError> {
        let start = Instant::now();
        let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let variant = variant::assign_variant(user_id);

        let pinned_version = self.registry.get_serving_version_async(variant.as_str().to_string()).await?;
        let artifact = match pinned_version {
            Some(version) => self.registry.get_artifact_async(version).await?,
            None => None,
        };
        let artifact = match artifact {
            Some(a) => a,
            None => {
                let models = self.registry.list_models_async().await?;
                models
                    .into_iter()
                    .next()
                    .ok_or_else(|| RecError::not_found("no model artifacts registered"))?
            }
        };

        let recommendations = scoring::top_n(&artifact.counts, n);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let trace = PredictionTrace {
            request_id: request_id.clone(),
            user_id: user_id.to_string(),
            variant: variant.as_str().to_string(),
            model_version: artifact.version.clone(),
            data_snapshot_id: artifact.data_snapshot_id.clone(),
            pipeline_git_sha: self.pipeline_git_sha.clone(),
            container_image_digest: self.container_image_digest.clone(),
            recommendations: recommendations.clone(),
            latency_ms,
            metadata: serde_json::Value::Null,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(err) = self.registry.upsert_trace_async(trace).await {
            tracing::error!(%err, request_id, "serving: trace persist failed");
        }

        self.emit_recommend_event(user_id, &variant, &artifact.version, &request_id, n, &recommendations);

        Ok(RecommendResult {
            request_id,
            variant,
            model_version: artifact.version,
            data_snapshot_id: artifact.data_snapshot_id,
            recommendations,
        })
    }

    fn emit_recommend_event(
        &self,
        user_id: &str,
        variant: &Variant,
        model_version: &str,
        request_id: &str,
        limit: usize,
        recommendations: &[ScoredItem],
    ) {
        let payload = RecommendPayload {
            items: recommendations.iter().map(|r| r.item_id.clone()).collect(),
            variant: Some(variant.as_str().to_string()),
            request_id: Some(request_id.to_string()),
            model_version: Some(model_version.to_string()),
            limit: Some(limit as u32),
        };
        let event = RawEvent::new_recommend(user_id, chrono::Utc::now().timestamp_millis(), payload);
        let store = self.store.clone();
        let bus = self.bus.clone();
        let topic = rec_events::topics::RECOMMEND_EVENTS;
        tokio::spawn(async move {
            if let Err(err) = store.append_async(event.clone()).await {
                tracing::error!(%err, "serving: recommend event emission failed, continuing");
                return;
            }
            bus.publish(topic, event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::{ModelArtifact, ModelStatus};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn engine() -> ServingEngine {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("events.sqlite");
        let registry_path = dir.path().join("registry.sqlite");
        std::mem::forget(dir);
        let store = Arc::new(EventStore::open(&store_path, 10_000).unwrap());
        let registry = Arc::new(Registry::open(&registry_path, None).unwrap());
        let mut counts = HashMap::new();
        counts.insert("item-a".to_string(), 10.0);
        counts.insert("item-b".to_string(), 20.0);
        registry
            .register_artifact(&ModelArtifact {
                version: "1.0.0".to_string(),
                status: ModelStatus::Staging,
                counts,
                trained_at: "2024-01-01T00:00:00Z".to_string(),
                metrics: serde_json::json!({}),
                data_snapshot_id: "snap-1".to_string(),
                pipeline_git_sha: "abc".to_string(),
                container_image_digest: "sha256:x".to_string(),
                artifact_uri: "s3://bucket/v1".to_string(),
            })
            .unwrap();
        ServingEngine::new(registry, store, Arc::new(Bus::default()), "abc".into(), "sha256:x".into())
    }

    #[tokio::test]
    async fn recommend_falls_back_to_newest_artifact_when_unpinned() {
        let engine = engine();
        let result = engine.recommend("user-1", 1, None).await.unwrap();
        assert_eq!(result.model_version, "1.0.0");
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].item_id, "item-b");
    }

    #[tokio::test]
    async fn recommend_generates_request_id_when_absent() {
        let engine = engine();
        let result = engine.recommend("user-2", 2, None).await.unwrap();
        assert!(!result.request_id.is_empty());
    }

    #[tokio::test]
    async fn recommend_fails_with_no_artifacts() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("events.sqlite");
        let registry_path = dir.path().join("registry.sqlite");
        std::mem::forget(dir);
        let store = Arc::new(EventStore::open(&store_path, 10_000).unwrap());
        let registry = Arc::new(Registry::open(&registry_path, None).unwrap());
        let engine = ServingEngine::new(registry, store, Arc::new(Bus::default()), "abc".into(), "sha256:x".into());
        let err = engine.recommend("user-1", 1, None).await.unwrap_err();
        assert_eq!(err.category.code(), "not-found");
    }
}
