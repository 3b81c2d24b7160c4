//! Advisory on-disk mirror of a registered artifact:
//! `{registryRoot}/{version}/model.json` and `metadata.json` (spec §6).
//! The document store remains canonical; a failure writing the mirror is
//! logged, never propagated.

use rec_protocol::ModelArtifact;
use std::path::Path;

pub(crate) async fn write_mirror(registry_root: &Path, artifact: &ModelArtifact) {
    let dir = registry_root.join(&artifact.version);
    if let Err(err) = tokio::fs::create_dir_all(&dir).await {
        tracing::warn!(version = %artifact.version, %err, "registry disk mirror: create_dir_all failed");
        return;
    }

    let model_json = serde_json::json!({ "counts": artifact.counts });
    if let Err(err) = write_json(&dir.join("model.json"), &model_json).await {
        tracing::warn!(version = %artifact.version, %err, "registry disk mirror: model.json write failed");
    }

    let metadata_json = serde_json::json!({
        "version": artifact.version,
        "dataSnapshotId": artifact.data_snapshot_id,
        "pipelineGitSha": artifact.pipeline_git_sha,
        "containerImageDigest": artifact.container_image_digest,
        "artifactUri": artifact.artifact_uri,
        "metrics": artifact.metrics,
        "trainedAt": artifact.trained_at,
    });
    if let Err(err) = write_json(&dir.join("metadata.json"), &metadata_json).await {
        tracing::warn!(version = %artifact.version, %err, "registry disk mirror: metadata.json write failed");
    }
}

async fn write_json(path: &Path, value: &serde_json::Value) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value).unwrap_or_default();
    tokio::fs::write(path, bytes).await
}
