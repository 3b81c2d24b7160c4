//! Registry schema: the `artifacts` table, the singleton `serving_state`
//! row, and the `traces` table keyed by `request_id` (spec §3).

use anyhow::Result;
use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
          version TEXT PRIMARY KEY,
          status TEXT NOT NULL,
          counts TEXT NOT NULL,
          trained_at TEXT NOT NULL,
          metrics TEXT NOT NULL,
          data_snapshot_id TEXT,
          pipeline_git_sha TEXT,
          container_image_digest TEXT,
          artifact_uri TEXT,
          created_seq INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_artifacts_status ON artifacts(status);

        CREATE TABLE IF NOT EXISTS serving_state (
          id TEXT PRIMARY KEY CHECK (id = 'model-serving-state'),
          default_version TEXT,
          control_version TEXT,
          treatment_version TEXT,
          updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS traces (
          request_id TEXT PRIMARY KEY,
          user_id TEXT NOT NULL,
          variant TEXT NOT NULL,
          model_version TEXT NOT NULL,
          data_snapshot_id TEXT,
          pipeline_git_sha TEXT,
          container_image_digest TEXT,
          recommendations TEXT NOT NULL,
          latency_ms INTEGER NOT NULL,
          metadata TEXT,
          created_at TEXT NOT NULL
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO serving_state(id, default_version, control_version, treatment_version, updated_at) \
         VALUES ('model-serving-state', NULL, NULL, NULL, '')",
        [],
    )?;
    Ok(())
}
