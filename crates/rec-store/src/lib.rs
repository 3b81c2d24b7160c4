//! C1 — Event Store Facade: append-only raw-event writes, time-/type-/
//! user-indexed reads, aggregations, and a dead-letter ledger.
//!
//! Backed by a pooled `rusqlite` connection (teacher's `arw-kernel` idiom,
//! trimmed — see `pool.rs`). Every public method has a blocking core and an
//! `..._async` wrapper that crosses a `spawn_blocking` boundary, matching
//! the teacher's `Kernel::run_blocking` convention so callers never block
//! the async runtime on sqlite I/O.

mod aggregate;
mod filter;
mod pool;
mod schema;

pub use aggregate::{FunnelAggregate, ItemTrendAggregate, ItemTrendRow, UserEngagementAggregate};
pub use filter::EventFilter;

use anyhow::{anyhow, Result};
use pool::Pool;
use rec_protocol::RawEvent;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

/// Result of a time-range scan. `partial` is set when the row cap
/// (spec §4.2 "Safety bound") was hit before the scan reached `to`.
#[derive(Debug, Clone)]
pub struct RangeResult {
    pub events: Vec<RawEvent>,
    pub partial: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub id: i64,
    pub received_at: i64,
    pub reason: String,
    pub raw_payload: serde_json::Value,
}

#[derive(Clone)]
pub struct EventStore {
    pool: Pool,
    row_cap: usize,
}

impl EventStore {
    pub fn open(path: &Path, row_cap: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let pool = Pool::open(path, 4)?;
        {
            let conn = pool.get()?;
            schema::init(&conn)?;
        }
        Ok(EventStore {
            pool,
            row_cap: row_cap.max(1),
        })
    }

    async fn run_blocking<F, R>(&self, job: F) -> Result<R>
    where
        F: FnOnce(EventStore) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || job(store))
            .await
            .map_err(|e| anyhow!("event store task panicked: {e}"))?
    }

    /// Strictly additive, durable on return (spec §4.2).
    pub fn append(&self, event: &RawEvent) -> Result<i64> {
        let conn = self.pool.get()?;
        let payload = serde_json::to_string(event)?;
        conn.execute(
            "INSERT INTO events(ts, kind, user_id, item_id, variant, payload) VALUES (?,?,?,?,?,?)",
            params![
                event.ts,
                event.kind.as_str(),
                event.user_id,
                event.item_id,
                event.variant(),
                payload,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn append_async(&self, event: RawEvent) -> Result<i64> {
        self.run_blocking(move |s| s.append(&event)).await
    }

    /// Events with `ts ∈ [from, to]`, ascending by `ts` then insertion order
    /// (the `id` autoincrement column is exactly that tie-break), capped at
    /// `row_cap` rows (spec §4.2).
    ///
    /// The kind filter (`kind`/`kinds`) is pushed into the SQL `WHERE`
    /// clause rather than applied after the fact: the `LIMIT` has to see
    /// the same predicate the caller asked for, or a narrow kind filter
    /// over a wide table would starve the page and misreport `partial`.
    pub fn range(&self, from: i64, to: i64, filter: &EventFilter) -> Result<RangeResult> {
        let conn = self.pool.get()?;
        let kind_strs: Vec<&'static str> = if let Some(k) = filter.kind {
            vec![k.as_str()]
        } else if let Some(set) = &filter.kinds {
            set.iter().map(|k| k.as_str()).collect()
        } else {
            Vec::new()
        };

        let mut sql = String::from(
            "SELECT payload FROM events \
             WHERE ts >= ?1 AND ts <= ?2 \
             AND (?3 IS NULL OR user_id = ?3) \
             AND (?4 IS NULL OR item_id = ?4) \
             AND (?5 IS NULL OR variant = ?5)",
        );
        if !kind_strs.is_empty() {
            let placeholders = vec!["?"; kind_strs.len()].join(",");
            sql.push_str(&format!(" AND kind IN ({placeholders})"));
        }
        sql.push_str(" ORDER BY ts ASC, id ASC LIMIT ?");

        let mut stmt = conn.prepare(&sql)?;
        let limit = self.row_cap as i64 + 1;
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(from),
            Box::new(to),
            Box::new(filter.user_id.clone()),
            Box::new(filter.item_id.clone()),
            Box::new(filter.variant.clone()),
        ];
        for k in &kind_strs {
            param_values.push(Box::new(k.to_string()));
        }
        param_values.push(Box::new(limit));

        let mut rows = stmt.query(rusqlite::params_from_iter(
            param_values.iter().map(|b| b.as_ref()),
        ))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            let payload: String = row.get(0)?;
            let event: RawEvent = serde_json::from_str(&payload)?;
            events.push(event);
        }
        let partial = events.len() > self.row_cap;
        events.truncate(self.row_cap);
        Ok(RangeResult { events, partial })
    }

    pub async fn range_async(&self, from: i64, to: i64, filter: EventFilter) -> Result<RangeResult> {
        self.run_blocking(move |s| s.range(from, to, &filter)).await
    }

    pub fn aggregate_funnel(&self, from: i64, variant: Option<&str>) -> Result<FunnelAggregate> {
        let conn = self.pool.get()?;
        let count = |kind: &str, variant_filter: bool| -> rusqlite::Result<i64> {
            if variant_filter {
                conn.query_row(
                    "SELECT COUNT(*) FROM events WHERE ts >= ?1 AND kind = ?2 AND (?3 IS NULL OR variant = ?3)",
                    params![from, kind, variant],
                    |r| r.get(0),
                )
            } else {
                conn.query_row(
                    "SELECT COUNT(*) FROM events WHERE ts >= ?1 AND kind = ?2",
                    params![from, kind],
                    |r| r.get(0),
                )
            }
        };
        let recommend_count = count("recommend", true)?;
        let play_count = count("play", false)?;
        let view_count = count("view", false)?;
        let skip_count = count("skip", false)?;
        let distinct_users: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM events WHERE ts >= ?1",
            params![from],
            |r| r.get(0),
        )?;
        Ok(FunnelAggregate {
            from,
            variant: variant.map(|s| s.to_string()),
            recommend_count,
            play_count,
            view_count,
            skip_count,
            distinct_users,
        })
    }

    pub async fn aggregate_funnel_async(
        &self,
        from: i64,
        variant: Option<String>,
    ) -> Result<FunnelAggregate> {
        self.run_blocking(move |s| s.aggregate_funnel(from, variant.as_deref()))
            .await
    }

    pub fn aggregate_item_trend(
        &self,
        from: i64,
        item_id: Option<&str>,
    ) -> Result<ItemTrendAggregate> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT item_id, \
                    SUM(CASE WHEN kind='recommend' THEN 1 ELSE 0 END), \
                    SUM(CASE WHEN kind='play' THEN 1 ELSE 0 END), \
                    SUM(CASE WHEN kind='view' THEN 1 ELSE 0 END) \
             FROM events \
             WHERE ts >= ?1 AND item_id IS NOT NULL AND (?2 IS NULL OR item_id = ?2) \
             GROUP BY item_id ORDER BY item_id ASC",
        )?;
        let mut rows = stmt.query(params![from, item_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(ItemTrendRow {
                item_id: row.get(0)?,
                recommend_count: row.get(1)?,
                play_count: row.get(2)?,
                view_count: row.get(3)?,
            });
        }
        Ok(ItemTrendAggregate { from, items })
    }

    pub async fn aggregate_item_trend_async(
        &self,
        from: i64,
        item_id: Option<String>,
    ) -> Result<ItemTrendAggregate> {
        self.run_blocking(move |s| s.aggregate_item_trend(from, item_id.as_deref()))
            .await
    }

    pub fn aggregate_user_engagement(&self, from: i64) -> Result<UserEngagementAggregate> {
        let conn = self.pool.get()?;
        let distinct_users: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM events WHERE ts >= ?1 AND kind IN ('play','view')",
            params![from],
            |r| r.get(0),
        )?;
        let total_interactions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE ts >= ?1 AND kind IN ('play','view')",
            params![from],
            |r| r.get(0),
        )?;
        let avg = if distinct_users > 0 {
            total_interactions as f64 / distinct_users as f64
        } else {
            0.0
        };
        Ok(UserEngagementAggregate {
            from,
            distinct_users,
            total_interactions,
            avg_interactions_per_user: avg,
        })
    }

    pub async fn aggregate_user_engagement_async(&self, from: i64) -> Result<UserEngagementAggregate> {
        self.run_blocking(move |s| s.aggregate_user_engagement(from))
            .await
    }

    /// Appends to the dead-letter ledger (SPEC_FULL §4) rather than just
    /// logging — callers can later replay/inspect what ingest rejected.
    pub fn append_dead_letter(
        &self,
        received_at: i64,
        reason: &str,
        raw_payload: &serde_json::Value,
    ) -> Result<i64> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO dead_letters(received_at, reason, raw_payload) VALUES (?,?,?)",
            params![received_at, reason, raw_payload.to_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn append_dead_letter_async(
        &self,
        received_at: i64,
        reason: String,
        raw_payload: serde_json::Value,
    ) -> Result<i64> {
        self.run_blocking(move |s| s.append_dead_letter(received_at, &reason, &raw_payload))
            .await
    }

    pub fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, received_at, reason, raw_payload FROM dead_letters \
             ORDER BY id DESC LIMIT ?1",
        )?;
        let mut rows = stmt.query(params![limit])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(3)?;
            out.push(DeadLetter {
                id: row.get(0)?,
                received_at: row.get(1)?,
                reason: row.get(2)?,
                raw_payload: serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null),
            });
        }
        Ok(out)
    }

    pub fn get_by_request_id(&self, request_id: &str) -> Result<Option<RawEvent>> {
        let conn = self.pool.get()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM events WHERE kind='recommend' \
                 AND json_extract(payload, '$.recommend.requestId') = ?1 \
                 ORDER BY id DESC LIMIT 1",
                params![request_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(match payload {
            Some(p) => Some(serde_json::from_str(&p)?),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::{EventType, RecommendPayload};
    use tempfile::tempdir;

    fn store() -> EventStore {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        std::mem::forget(dir); // keep the tempdir alive for the store's lifetime in tests
        EventStore::open(&path, 100_000).unwrap()
    }

    #[test]
    fn append_then_range_round_trips() {
        let store = store();
        let event = RawEvent::new_interaction(EventType::Play, "u1", "i1", 100);
        store.append(&event).unwrap();
        let result = store.range(0, 1000, &EventFilter::default()).unwrap();
        assert_eq!(result.events.len(), 1);
        assert!(!result.partial);
        assert_eq!(result.events[0].user_id, "u1");
    }

    #[test]
    fn range_orders_by_ts_ascending() {
        let store = store();
        store
            .append(&RawEvent::new_interaction(EventType::View, "u1", "i2", 200))
            .unwrap();
        store
            .append(&RawEvent::new_interaction(EventType::View, "u1", "i1", 100))
            .unwrap();
        let result = store.range(0, 1000, &EventFilter::default()).unwrap();
        let timestamps: Vec<i64> = result.events.iter().map(|e| e.ts).collect();
        assert_eq!(timestamps, vec![100, 200]);
    }

    #[test]
    fn row_cap_sets_partial_flag() {
        let store = EventStore::open(
            &{
                let dir = tempdir().unwrap();
                let p = dir.path().join("events.sqlite");
                std::mem::forget(dir);
                p
            },
            2,
        )
        .unwrap();
        for i in 0..5 {
            store
                .append(&RawEvent::new_interaction(EventType::View, "u1", "i1", i))
                .unwrap();
        }
        let result = store.range(0, 1000, &EventFilter::default()).unwrap();
        assert_eq!(result.events.len(), 2);
        assert!(result.partial);
    }

    #[test]
    fn filters_by_variant() {
        let store = store();
        let mut payload = RecommendPayload::default();
        payload.items = vec!["i1".into()];
        payload.variant = Some("treatment".into());
        store
            .append(&RawEvent::new_recommend("u1", 100, payload))
            .unwrap();
        let mut filter = EventFilter::default();
        filter.variant = Some("control".into());
        let result = store.range(0, 1000, &filter).unwrap();
        assert!(result.events.is_empty());
    }

    #[test]
    fn kind_filter_applies_before_row_cap() {
        // A narrow kind filter over a table dominated by other kinds must
        // not starve the page: the cap has to bind after the kind
        // predicate, not before it.
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        std::mem::forget(dir);
        let store = EventStore::open(&path, 2).unwrap();
        for i in 0..20 {
            store
                .append(&RawEvent::new_interaction(EventType::View, "u1", "i1", i))
                .unwrap();
        }
        for i in 0..3 {
            store
                .append(&RawEvent::new_interaction(EventType::Play, "u1", "i1", 100 + i))
                .unwrap();
        }
        let mut filter = EventFilter::default();
        filter.kind = Some(EventType::Play);
        let result = store.range(0, 1000, &filter).unwrap();
        assert_eq!(result.events.len(), 2);
        assert!(result.partial);
        assert!(result.events.iter().all(|e| e.kind == EventType::Play));
    }

    #[test]
    fn dead_letters_round_trip() {
        let store = store();
        store
            .append_dead_letter(0, "unknown event type", &serde_json::json!({"type": "x"}))
            .unwrap();
        let letters = store.list_dead_letters(10).unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].reason, "unknown event type");
    }
}
