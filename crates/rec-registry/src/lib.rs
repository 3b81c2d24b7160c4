//! C2 — Registry Store: versioned model artifacts, the singleton
//! serving-state document, and the `requestId`-keyed trace store that
//! backs the serving engine's provenance writes.
//!
//! Same sync-core / `_async` wrapper convention as `rec-store`. State
//! transitions in [`Registry::set_serving_version`] are applied inside a
//! single `rusqlite` transaction — stronger atomicity than spec §5 requires
//! ("no cross-document atomicity is required"), which is fine: a stronger
//! guarantee never violates a weaker one.

mod disk_mirror;
mod pool;
mod schema;
mod version;

pub use version::Bump;

use anyhow::{anyhow, Result as AnyResult};
use pool::Pool;
use rec_protocol::{
    ModelArtifact, ModelStatus, PredictionTrace, RecError, ServingState, ServingTarget,
};
use rusqlite::{params, OptionalExtension};
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct Registry {
    pool: Pool,
    registry_root: Option<PathBuf>,
}

impl Registry {
    pub fn open(path: &Path, registry_root: Option<PathBuf>) -> AnyResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let pool = Pool::open(path, 2)?;
        {
            let conn = pool.get()?;
            schema::init(&conn)?;
        }
        Ok(Registry { pool, registry_root })
    }

    async fn run_blocking<F, R>(&self, job: F) -> AnyResult<R>
    where
        F: FnOnce(Registry) -> AnyResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let registry = self.clone();
        tokio::task::spawn_blocking(move || job(registry))
            .await
            .map_err(|e| anyhow!("registry task panicked: {e}"))?
    }

    /// Inserts a freshly trained artifact in `staging` status. Training is
    /// an external collaborator (spec §3 "Lifecycle"); this is the seam it
    /// writes through.
    pub fn register_artifact(&self, artifact: &ModelArtifact) -> Result<(), RecError> {
        let conn = self.pool.get().map_err(RecError::from)?;
        let counts = serde_json::to_string(&artifact.counts).map_err(|e| RecError::internal(e.to_string()))?;
        let metrics = artifact.metrics.to_string();
        let next_seq: i64 = conn
            .query_row("SELECT COALESCE(MAX(created_seq), 0) + 1 FROM artifacts", [], |r| r.get(0))
            .map_err(|e| RecError::internal(e.to_string()))?;
        conn.execute(
            "INSERT INTO artifacts(version, status, counts, trained_at, metrics, data_snapshot_id, \
             pipeline_git_sha, container_image_digest, artifact_uri, created_seq) \
             VALUES (?,?,?,?,?,?,?,?,?,?)",
            params![
                artifact.version,
                ModelStatus::Staging.as_str(),
                counts,
                artifact.trained_at,
                metrics,
                artifact.data_snapshot_id,
                artifact.pipeline_git_sha,
                artifact.container_image_digest,
                artifact.artifact_uri,
                next_seq,
            ],
        )
        .map_err(|e| RecError::internal(e.to_string()))?;
        Ok(())
    }

    pub async fn register_artifact_async(&self, artifact: ModelArtifact) -> Result<(), RecError> {
        let registry_root = self.registry_root.clone();
        let result = self
            .run_blocking(move |r| r.register_artifact(&artifact).map(|_| artifact).map_err(anyhow::Error::from))
            .await
            .map_err(RecError::from)?;
        if let Some(root) = registry_root {
            disk_mirror::write_mirror(&root, &result).await;
        }
        Ok(())
    }

    pub fn get_artifact(&self, version: &str) -> Result<Option<ModelArtifact>, RecError> {
        let conn = self.pool.get().map_err(RecError::from)?;
        row_to_artifact(conn.query_row(
            "SELECT version, status, counts, trained_at, metrics, data_snapshot_id, \
             pipeline_git_sha, container_image_digest, artifact_uri FROM artifacts WHERE version = ?1",
            params![version],
            artifact_from_row,
        ))
    }

    pub async fn get_artifact_async(&self, version: String) -> Result<Option<ModelArtifact>, RecError> {
        self.run_blocking(move |r| r.get_artifact(&version).map_err(anyhow::Error::from))
            .await
            .map_err(RecError::from)
    }

    /// `listModels` (spec §4.9) — every known artifact, newest first.
    pub fn list_models(&self) -> Result<Vec<ModelArtifact>, RecError> {
        let conn = self.pool.get().map_err(RecError::from)?;
        let mut stmt = conn
            .prepare(
                "SELECT version, status, counts, trained_at, metrics, data_snapshot_id, \
                 pipeline_git_sha, container_image_digest, artifact_uri FROM artifacts \
                 ORDER BY created_seq DESC",
            )
            .map_err(|e| RecError::internal(e.to_string()))?;
        let rows = stmt
            .query_map([], artifact_from_row)
            .map_err(|e| RecError::internal(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| RecError::internal(e.to_string()))?);
        }
        Ok(out)
    }

    pub async fn list_models_async(&self) -> Result<Vec<ModelArtifact>, RecError> {
        self.run_blocking(|r| r.list_models().map_err(anyhow::Error::from))
            .await
            .map_err(RecError::from)
    }

    pub fn get_serving_state(&self) -> Result<ServingState, RecError> {
        let conn = self.pool.get().map_err(RecError::from)?;
        conn.query_row(
            "SELECT default_version, control_version, treatment_version, updated_at \
             FROM serving_state WHERE id = 'model-serving-state'",
            [],
            |row| {
                Ok(ServingState {
                    default_version: row.get(0)?,
                    control_version: row.get(1)?,
                    treatment_version: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .map_err(|e| RecError::internal(e.to_string()))
    }

    pub async fn get_serving_state_async(&self) -> Result<ServingState, RecError> {
        self.run_blocking(|r| r.get_serving_state().map_err(anyhow::Error::from))
            .await
            .map_err(RecError::from)
    }

    /// `getServingVersion(variant)` fallback chain (spec §4.3):
    /// `variants[variant] ?? defaultVersion ?? (latest active) ?? (newest) ?? nil`.
    pub fn get_serving_version(&self, variant: &str) -> Result<Option<String>, RecError> {
        let state = self.get_serving_state()?;
        if let Some(v) = state.version_for(variant) {
            return Ok(Some(v.to_string()));
        }
        let conn = self.pool.get().map_err(RecError::from)?;
        let active: Option<String> = conn
            .query_row(
                "SELECT version FROM artifacts WHERE status = 'active' ORDER BY created_seq DESC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| RecError::internal(e.to_string()))?;
        if active.is_some() {
            return Ok(active);
        }
        let newest: Option<String> = conn
            .query_row(
                "SELECT version FROM artifacts ORDER BY created_seq DESC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| RecError::internal(e.to_string()))?;
        Ok(newest)
    }

    pub async fn get_serving_version_async(&self, variant: String) -> Result<Option<String>, RecError> {
        self.run_blocking(move |r| r.get_serving_version(&variant).map_err(anyhow::Error::from))
            .await
            .map_err(RecError::from)
    }

    /// `setServingVersion(version, target)` — the transition table of
    /// spec §4.3, applied atomically. `updatedAt` is refreshed on every
    /// call, including ones that error after validation (it isn't —
    /// errors return before any write).
    pub fn set_serving_version(
        &self,
        version: &str,
        target: ServingTarget,
        now_rfc3339: &str,
    ) -> Result<ServingState, RecError> {
        let mut conn = self.pool.get().map_err(RecError::from)?;
        let exists: Option<String> = conn
            .query_row("SELECT version FROM artifacts WHERE version = ?1", params![version], |r| r.get(0))
            .optional()
            .map_err(|e| RecError::internal(e.to_string()))?;
        if exists.is_none() {
            return Err(RecError::not_found(format!("no artifact with version {version}")));
        }

        let tx = conn.transaction().map_err(|e| RecError::internal(e.to_string()))?;
        match target {
            ServingTarget::All => {
                tx.execute(
                    "UPDATE artifacts SET status = 'archived' WHERE status IN ('active', 'shadow') AND version <> ?1",
                    params![version],
                )
                .map_err(|e| RecError::internal(e.to_string()))?;
                tx.execute("UPDATE artifacts SET status = 'active' WHERE version = ?1", params![version])
                    .map_err(|e| RecError::internal(e.to_string()))?;
                tx.execute(
                    "UPDATE serving_state SET default_version = ?1, control_version = ?1, treatment_version = ?1, updated_at = ?2 \
                     WHERE id = 'model-serving-state'",
                    params![version, now_rfc3339],
                )
                .map_err(|e| RecError::internal(e.to_string()))?;
            }
            ServingTarget::Control => {
                tx.execute(
                    "UPDATE artifacts SET status = 'archived' WHERE status = 'active' AND version <> ?1",
                    params![version],
                )
                .map_err(|e| RecError::internal(e.to_string()))?;
                tx.execute("UPDATE artifacts SET status = 'active' WHERE version = ?1", params![version])
                    .map_err(|e| RecError::internal(e.to_string()))?;
                tx.execute(
                    "UPDATE serving_state SET control_version = ?1, default_version = ?1, updated_at = ?2 \
                     WHERE id = 'model-serving-state'",
                    params![version, now_rfc3339],
                )
                .map_err(|e| RecError::internal(e.to_string()))?;
            }
            ServingTarget::Treatment => {
                tx.execute("UPDATE artifacts SET status = 'shadow' WHERE version = ?1", params![version])
                    .map_err(|e| RecError::internal(e.to_string()))?;
                tx.execute(
                    "UPDATE serving_state SET treatment_version = ?1, updated_at = ?2 WHERE id = 'model-serving-state'",
                    params![version, now_rfc3339],
                )
                .map_err(|e| RecError::internal(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| RecError::internal(e.to_string()))?;
        drop(conn);
        self.get_serving_state()
    }

    pub async fn set_serving_version_async(
        &self,
        version: String,
        target: ServingTarget,
        now_rfc3339: String,
    ) -> Result<ServingState, RecError> {
        self.run_blocking(move |r| {
            r.set_serving_version(&version, target, &now_rfc3339)
                .map_err(anyhow::Error::from)
        })
        .await
        .map_err(RecError::from)
    }

    /// `computeNextVersion(bump)` — increments the newest artifact's
    /// version (spec §4.3); default bump is minor.
    pub fn compute_next_version(&self, bump: Bump) -> Result<String, RecError> {
        let conn = self.pool.get().map_err(RecError::from)?;
        let latest: Option<String> = conn
            .query_row("SELECT version FROM artifacts ORDER BY created_seq DESC LIMIT 1", [], |r| r.get(0))
            .optional()
            .map_err(|e| RecError::internal(e.to_string()))?;
        Ok(version::next_version(latest.as_deref(), bump))
    }

    /// Idempotent upsert keyed by `request_id` (spec §3, "re-serving with
    /// the same id overwrites").
    pub fn upsert_trace(&self, trace: &PredictionTrace) -> Result<(), RecError> {
        let conn = self.pool.get().map_err(RecError::from)?;
        let recommendations =
            serde_json::to_string(&trace.recommendations).map_err(|e| RecError::internal(e.to_string()))?;
        let metadata = trace.metadata.to_string();
        conn.execute(
            "INSERT INTO traces(request_id, user_id, variant, model_version, data_snapshot_id, \
             pipeline_git_sha, container_image_digest, recommendations, latency_ms, metadata, created_at) \
             VALUES (?,?,?,?,?,?,?,?,?,?,?) \
             ON CONFLICT(request_id) DO UPDATE SET \
               user_id = excluded.user_id, variant = excluded.variant, model_version = excluded.model_version, \
               data_snapshot_id = excluded.data_snapshot_id, pipeline_git_sha = excluded.pipeline_git_sha, \
               container_image_digest = excluded.container_image_digest, recommendations = excluded.recommendations, \
               latency_ms = excluded.latency_ms, metadata = excluded.metadata, created_at = excluded.created_at",
            params![
                trace.request_id,
                trace.user_id,
                trace.variant,
                trace.model_version,
                trace.data_snapshot_id,
                trace.pipeline_git_sha,
                trace.container_image_digest,
                recommendations,
                trace.latency_ms,
                metadata,
                trace.created_at,
            ],
        )
        .map_err(|e| RecError::internal(e.to_string()))?;
        Ok(())
    }

    pub async fn upsert_trace_async(&self, trace: PredictionTrace) -> Result<(), RecError> {
        self.run_blocking(move |r| r.upsert_trace(&trace).map_err(anyhow::Error::from))
            .await
            .map_err(RecError::from)
    }

    pub fn get_trace(&self, request_id: &str) -> Result<Option<PredictionTrace>, RecError> {
        let conn = self.pool.get().map_err(RecError::from)?;
        conn.query_row(
            "SELECT request_id, user_id, variant, model_version, data_snapshot_id, pipeline_git_sha, \
             container_image_digest, recommendations, latency_ms, metadata, created_at FROM traces \
             WHERE request_id = ?1",
            params![request_id],
            |row| {
                let recommendations_raw: String = row.get(7)?;
                let metadata_raw: Option<String> = row.get(9)?;
                Ok(PredictionTrace {
                    request_id: row.get(0)?,
                    user_id: row.get(1)?,
                    variant: row.get(2)?,
                    model_version: row.get(3)?,
                    data_snapshot_id: row.get(4)?,
                    pipeline_git_sha: row.get(5)?,
                    container_image_digest: row.get(6)?,
                    recommendations: serde_json::from_str(&recommendations_raw).unwrap_or_default(),
                    latency_ms: row.get(8)?,
                    metadata: metadata_raw
                        .and_then(|m| serde_json::from_str(&m).ok())
                        .unwrap_or(serde_json::Value::Null),
                    created_at: row.get(10)?,
                })
            },
        )
        .optional()
        .map_err(|e| RecError::internal(e.to_string()))
    }

    pub async fn get_trace_async(&self, request_id: String) -> Result<Option<PredictionTrace>, RecError> {
        self.run_blocking(move |r| r.get_trace(&request_id).map_err(anyhow::Error::from))
            .await
            .map_err(RecError::from)
    }
}

fn artifact_from_row(row: &rusqlite::Row) -> rusqlite::Result<ModelArtifact> {
    let status_str: String = row.get(1)?;
    let counts_raw: String = row.get(2)?;
    let metrics_raw: String = row.get(4)?;
    Ok(ModelArtifact {
        version: row.get(0)?,
        status: ModelStatus::parse(&status_str).unwrap_or(ModelStatus::Archived),
        counts: serde_json::from_str(&counts_raw).unwrap_or_default(),
        trained_at: row.get(3)?,
        metrics: serde_json::from_str(&metrics_raw).unwrap_or(serde_json::Value::Null),
        data_snapshot_id: row.get(5)?,
        pipeline_git_sha: row.get(6)?,
        container_image_digest: row.get(7)?,
        artifact_uri: row.get(8)?,
    })
}

fn row_to_artifact(
    result: rusqlite::Result<ModelArtifact>,
) -> Result<Option<ModelArtifact>, RecError> {
    match result {
        Ok(artifact) => Ok(Some(artifact)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(RecError::internal(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn registry() -> Registry {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sqlite");
        std::mem::forget(dir);
        Registry::open(&path, None).unwrap()
    }

    fn sample_artifact(version: &str) -> ModelArtifact {
        let mut counts = HashMap::new();
        counts.insert("item-a".to_string(), 10.0);
        ModelArtifact {
            version: version.to_string(),
            status: ModelStatus::Staging,
            counts,
            trained_at: "2024-01-01T00:00:00Z".to_string(),
            metrics: serde_json::json!({}),
            data_snapshot_id: "snap-1".to_string(),
            pipeline_git_sha: "abc123".to_string(),
            container_image_digest: "sha256:deadbeef".to_string(),
            artifact_uri: "s3://bucket/v1".to_string(),
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = registry();
        registry.register_artifact(&sample_artifact("1.0.0")).unwrap();
        let fetched = registry.get_artifact("1.0.0").unwrap().unwrap();
        assert_eq!(fetched.status, ModelStatus::Staging);
        assert_eq!(fetched.counts.get("item-a"), Some(&10.0));
    }

    #[test]
    fn set_serving_all_activates_and_binds_both_variants() {
        let registry = registry();
        registry.register_artifact(&sample_artifact("1.0.0")).unwrap();
        let state = registry
            .set_serving_version("1.0.0", ServingTarget::All, "2024-01-01T00:00:00Z")
            .unwrap();
        assert_eq!(state.control_version.as_deref(), Some("1.0.0"));
        assert_eq!(state.treatment_version.as_deref(), Some("1.0.0"));
        let artifact = registry.get_artifact("1.0.0").unwrap().unwrap();
        assert_eq!(artifact.status, ModelStatus::Active);
    }

    #[test]
    fn set_serving_treatment_does_not_archive_active() {
        let registry = registry();
        registry.register_artifact(&sample_artifact("1.0.0")).unwrap();
        registry.register_artifact(&sample_artifact("1.1.0")).unwrap();
        registry
            .set_serving_version("1.0.0", ServingTarget::All, "2024-01-01T00:00:00Z")
            .unwrap();
        let state = registry
            .set_serving_version("1.1.0", ServingTarget::Treatment, "2024-01-01T00:01:00Z")
            .unwrap();
        assert_eq!(state.treatment_version.as_deref(), Some("1.1.0"));
        assert_eq!(state.control_version.as_deref(), Some("1.0.0"));
        let active = registry.get_artifact("1.0.0").unwrap().unwrap();
        assert_eq!(active.status, ModelStatus::Active);
        let shadow = registry.get_artifact("1.1.0").unwrap().unwrap();
        assert_eq!(shadow.status, ModelStatus::Shadow);
    }

    #[test]
    fn set_serving_unknown_version_is_not_found() {
        let registry = registry();
        let err = registry
            .set_serving_version("9.9.9", ServingTarget::All, "2024-01-01T00:00:00Z")
            .unwrap_err();
        assert_eq!(err.category.code(), "not-found");
    }

    #[test]
    fn get_serving_version_falls_back_to_newest_when_unset() {
        let registry = registry();
        registry.register_artifact(&sample_artifact("1.0.0")).unwrap();
        let version = registry.get_serving_version("control").unwrap();
        assert_eq!(version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn trace_upsert_overwrites_on_same_request_id() {
        let registry = registry();
        let trace = PredictionTrace {
            request_id: "r1".into(),
            user_id: "u1".into(),
            variant: "control".into(),
            model_version: "1.0.0".into(),
            data_snapshot_id: "snap-1".into(),
            pipeline_git_sha: "abc".into(),
            container_image_digest: "sha256:x".into(),
            recommendations: vec![],
            latency_ms: 5.0,
            metadata: serde_json::Value::Null,
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        registry.upsert_trace(&trace).unwrap();
        let mut updated = trace.clone();
        updated.latency_ms = 42.0;
        registry.upsert_trace(&updated).unwrap();
        let fetched = registry.get_trace("r1").unwrap().unwrap();
        assert_eq!(fetched.latency_ms, 42.0);
    }
}
