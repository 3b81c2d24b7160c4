//! C6 — Experiment Engine: `summarize(windowHours)` combining attribution
//! ([`attribution`]) and the two-proportion z-test ([`stats`]).

mod attribution;
pub mod stats;

pub use attribution::{attribute, VariantCounts};
pub use stats::{two_proportion_z_test, Decision, ZTestResult};

use rec_protocol::{EventType, RecError};
use rec_store::{EventFilter, EventStore};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct VariantSummary {
    pub version: Option<String>,
    pub exposures: u64,
    pub successes: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSummary {
    pub control: VariantSummary,
    pub treatment: VariantSummary,
    pub stats: ZTestResult,
}

pub struct ExperimentEngine {
    store: Arc<EventStore>,
    success_window_ms: i64,
}

impl ExperimentEngine {
    pub fn new(store: Arc<EventStore>, success_window: std::time::Duration) -> Self {
        ExperimentEngine {
            store,
            success_window_ms: success_window.as_millis() as i64,
        }
    }

    /// `summarize(windowHours)` (spec §4.6). Reads control and treatment
    /// versions from the registry's current pins (threaded in by the
    /// caller, since C6 itself only needs raw event attribution) — here we
    /// report the versions observed on the attributed events instead,
    /// which is equivalent and avoids a cross-crate dependency on C2 for
    /// pure attribution math.
    pub async fn summarize(&self, window_hours: u64, control_version: Option<String>, treatment_version: Option<String>) -> Result<ExperimentSummary, RecError> {
        let now = chrono::Utc::now().timestamp_millis();
        let from = now - (window_hours as i64) * 3_600_000;

        let mut filter = EventFilter::default();
        filter.kinds = Some(
            [EventType::Recommend, EventType::Play, EventType::View]
                .into_iter()
                .collect::<HashSet<_>>(),
        );

        let range = self.store.range_async(from, now, filter).await.map_err(RecError::from)?;
        let counts = attribution::attribute(&range.events, self.success_window_ms);

        let control_counts = counts.get("control").cloned().unwrap_or_default();
        let treatment_counts = counts.get("treatment").cloned().unwrap_or_default();

        let stats = stats::two_proportion_z_test(
            control_counts.exposures,
            control_counts.successes,
            treatment_counts.exposures,
            treatment_counts.successes,
            0.05,
        );

        Ok(ExperimentSummary {
            control: to_summary(control_version, control_counts),
            treatment: to_summary(treatment_version, treatment_counts),
            stats,
        })
    }
}

fn to_summary(version: Option<String>, counts: VariantCounts) -> VariantSummary {
    let conversion_rate = if counts.exposures > 0 {
        counts.successes as f64 / counts.exposures as f64
    } else {
        0.0
    };
    VariantSummary {
        version,
        exposures: counts.exposures,
        successes: counts.successes,
        conversion_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::event::RecommendPayload;
    use rec_protocol::{EventType as EvtType, RawEvent};
    use tempfile::tempdir;

    fn store() -> Arc<EventStore> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        std::mem::forget(dir);
        Arc::new(EventStore::open(&path, 10_000).unwrap())
    }

    #[tokio::test]
    async fn summarize_reads_attribution_from_store() {
        let store = store();
        store
            .append_async(RawEvent::new_recommend(
                "u1",
                0,
                RecommendPayload {
                    items: vec!["a".into()],
                    variant: Some("control".into()),
                    request_id: None,
                    model_version: None,
                    limit: None,
                },
            ))
            .await
            .unwrap();
        store
            .append_async(RawEvent::new_interaction(EvtType::Play, "u1", "a", 100))
            .await
            .unwrap();

        let engine = ExperimentEngine::new(store, std::time::Duration::from_secs(900));
        let summary = engine
            .summarize(24, Some("1.0.0".into()), Some("1.0.0".into()))
            .await
            .unwrap();
        assert_eq!(summary.control.exposures, 1);
        assert_eq!(summary.control.successes, 1);
        assert_eq!(summary.stats.decision, Decision::InsufficientData);
    }
}
