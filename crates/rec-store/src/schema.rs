//! Sqlite schema: the `events` table with the six secondary indexes spec
//! §4.2 requires, plus an append-only `dead_letters` ledger (SPEC_FULL §4).

use anyhow::Result;
use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS events (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          ts INTEGER NOT NULL,
          kind TEXT NOT NULL,
          user_id TEXT NOT NULL,
          item_id TEXT,
          variant TEXT,
          payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_ts_kind ON events(ts, kind);
        CREATE INDEX IF NOT EXISTS idx_events_ts_kind_variant ON events(ts, kind, variant);
        CREATE INDEX IF NOT EXISTS idx_events_user_ts ON events(user_id, ts);
        CREATE INDEX IF NOT EXISTS idx_events_item_ts ON events(item_id, ts);
        CREATE INDEX IF NOT EXISTS idx_events_kind_ts_desc ON events(kind, ts DESC);
        CREATE INDEX IF NOT EXISTS idx_events_variant_ts ON events(variant, ts);

        CREATE TABLE IF NOT EXISTS dead_letters (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          received_at INTEGER NOT NULL,
          reason TEXT NOT NULL,
          raw_payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_dead_letters_received ON dead_letters(received_at);
        "#,
    )?;
    Ok(())
}
