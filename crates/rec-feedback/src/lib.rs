//! C8 — Feedback-Loop Analyzer: cycle detection, amplification, and
//! anomaly flags over the raw event store (spec §4.8).

mod amplification;
mod anomalies;
mod lifecycle;

pub use amplification::{AmplificationEntry, Ratio};
pub use anomalies::{Anomaly, Severity};
pub use lifecycle::FeedbackLoop;

use rec_protocol::{EventType, RecError};
use rec_store::{EventFilter, EventStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySummary {
    AnomaliesDetected,
    NoAnomalies,
}

/// Wire shape per spec §8's literal scenarios: `{ loops: {feedbackLoops,
/// avgCycleTimeHours, items}, amplification: {mean, top10}, anomalies:
/// {summary, anomalies} }`.
#[derive(Serialize)]
pub struct FeedbackLoopReport {
    pub loops: LoopsSection,
    pub amplification: AmplificationSection,
    pub anomalies: AnomaliesSection,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopsSection {
    pub feedback_loops: usize,
    pub avg_cycle_time_hours: f64,
    pub items: Vec<FeedbackLoopView>,
}

#[derive(Serialize)]
pub struct AmplificationSection {
    pub mean: f64,
    pub top10: Vec<AmplificationView>,
}

#[derive(Serialize)]
pub struct AnomaliesSection {
    pub summary: AnomalySummary,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackLoopView {
    pub item_id: String,
    pub first_recommended: i64,
    pub first_interacted: i64,
    pub second_recommended: i64,
    pub cycle_time_ms: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmplificationView {
    pub item_id: String,
    pub before: u64,
    pub after: u64,
    pub ratio: Option<f64>,
}

pub struct FeedbackAnalyzer {
    store: Arc<EventStore>,
}

impl FeedbackAnalyzer {
    pub fn new(store: Arc<EventStore>) -> Self {
        FeedbackAnalyzer { store }
    }

    pub async fn analyze(&self, window_hours: u64) -> Result<FeedbackLoopReport, RecError> {
        let now = chrono::Utc::now().timestamp_millis();
        let from = now - (window_hours as i64) * 3_600_000;
        let mut filter = EventFilter::default();
        filter.kinds = Some(
            [EventType::Recommend, EventType::Play, EventType::View]
                .into_iter()
                .collect::<HashSet<_>>(),
        );
        let range = self.store.range_async(from, now, filter).await.map_err(RecError::from)?;

        let loops = lifecycle::detect_loops(&range.events);
        let amplification = amplification::compute(&range.events);
        let amplification_mean = amplification::mean_finite_ratio(&amplification);
        let top_10 = amplification::top_10_by_ratio(&amplification);

        let mut rec_slot_counts: HashMap<String, u64> = HashMap::new();
        for event in &range.events {
            if event.kind == EventType::Recommend {
                for item in event.recommended_items() {
                    *rec_slot_counts.entry(item).or_insert(0) += 1;
                }
            }
        }

        let found = anomalies::detect(&loops, &amplification, &rec_slot_counts);
        let summary = if found.is_empty() {
            AnomalySummary::NoAnomalies
        } else {
            AnomalySummary::AnomaliesDetected
        };

        let feedback_loops = loops.len();
        let avg_cycle_time_hours = if loops.is_empty() {
            0.0
        } else {
            let mean_ms: f64 = loops.iter().map(|l| l.cycle_time_ms as f64).sum::<f64>() / loops.len() as f64;
            mean_ms / 3_600_000.0
        };

        Ok(FeedbackLoopReport {
            loops: LoopsSection {
                feedback_loops,
                avg_cycle_time_hours,
                items: loops
                    .into_iter()
                    .map(|l| FeedbackLoopView {
                        item_id: l.item_id,
                        first_recommended: l.first_recommended,
                        first_interacted: l.first_interacted,
                        second_recommended: l.second_recommended,
                        cycle_time_ms: l.cycle_time_ms,
                    })
                    .collect(),
            },
            amplification: AmplificationSection {
                mean: amplification_mean,
                top10: top_10
                    .into_iter()
                    .map(|e| AmplificationView {
                        item_id: e.item_id,
                        before: e.before,
                        after: e.after,
                        ratio: match e.ratio {
                            Ratio::Finite(r) => Some(r),
                            Ratio::Infinite => None,
                        },
                    })
                    .collect(),
            },
            anomalies: AnomaliesSection {
                summary,
                anomalies: found,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::event::RecommendPayload;
    use rec_protocol::RawEvent;
    use tempfile::tempdir;

    fn store() -> Arc<EventStore> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        std::mem::forget(dir);
        Arc::new(EventStore::open(&path, 10_000).unwrap())
    }

    #[tokio::test]
    async fn analyze_reports_clean_summary_for_empty_store() {
        let analyzer = FeedbackAnalyzer::new(store());
        let report = analyzer.analyze(24).await.unwrap();
        assert_eq!(report.anomalies.summary, AnomalySummary::NoAnomalies);
        assert_eq!(report.loops.feedback_loops, 0);
        assert_eq!(report.loops.avg_cycle_time_hours, 0.0);
    }

    #[tokio::test]
    async fn analyze_detects_short_cycle_loop() {
        let store = store();
        store
            .append_async(RawEvent::new_recommend(
                "u1",
                0,
                RecommendPayload {
                    items: vec!["a".into()],
                    variant: None,
                    request_id: None,
                    model_version: None,
                    limit: None,
                },
            ))
            .await
            .unwrap();
        store
            .append_async(RawEvent::new_interaction(EventType::Play, "u1", "a", 100))
            .await
            .unwrap();
        store
            .append_async(RawEvent::new_recommend(
                "u1",
                500,
                RecommendPayload {
                    items: vec!["a".into()],
                    variant: None,
                    request_id: None,
                    model_version: None,
                    limit: None,
                },
            ))
            .await
            .unwrap();

        let analyzer = FeedbackAnalyzer::new(store);
        let report = analyzer.analyze(24).await.unwrap();
        assert_eq!(report.anomalies.summary, AnomalySummary::AnomaliesDetected);
        assert_eq!(report.loops.feedback_loops, 1);
        assert!(report.loops.avg_cycle_time_hours > 0.0);
        assert_eq!(report.loops.items.len(), 1);
    }
}
