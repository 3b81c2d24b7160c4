//! C7 — Fairness Analyzer: `evaluateFairness(windowHours)` over the raw
//! event store, cached per `(windowHours, variant)` with a 5-minute TTL
//! (spec §4.7). Grounded in the teacher's `moka`-backed `tool_cache`.

mod metrics;

pub use metrics::ExposureMetrics;

use rec_protocol::{EventType, RecError};
use rec_store::{EventFilter, EventStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const MAX_RAW_WINDOW_HOURS: u64 = 720;
const MAX_COMPARISON_WINDOW_HOURS: u64 = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FairnessVerdict {
    Fair,
    Unfair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiversityVerdict {
    Similar,
    Different,
}

#[derive(Debug, Clone, Serialize)]
pub struct FairnessComparison {
    pub control: ExposureMetrics,
    pub treatment: ExposureMetrics,
    pub exposure_fairness: FairnessVerdict,
    pub diversity_comparison: DiversityVerdict,
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    window_hours: u64,
    variant: Option<String>,
}

pub struct FairnessAnalyzer {
    store: Arc<EventStore>,
    cache: moka::future::Cache<CacheKey, Arc<ExposureMetrics>>,
}

impl FairnessAnalyzer {
    pub fn new(store: Arc<EventStore>) -> Self {
        FairnessAnalyzer {
            store,
            cache: moka::future::Cache::builder()
                .time_to_live(Duration::from_secs(5 * 60))
                .build(),
        }
    }

    /// Raw exposure metrics for a single variant (or all variants when
    /// `variant` is `None`), capped at 720 hours.
    pub async fn exposure(&self, window_hours: u64, variant: Option<String>) -> Result<Arc<ExposureMetrics>, RecError> {
        if window_hours > MAX_RAW_WINDOW_HOURS {
            return Err(RecError::range_too_large(format!(
                "windowHours {window_hours} exceeds raw-exposure cap of {MAX_RAW_WINDOW_HOURS}"
            )));
        }
        let key = CacheKey { window_hours, variant: variant.clone() };
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }
        let metrics = Arc::new(self.scan(window_hours, variant.as_deref()).await?);
        self.cache.insert(key, metrics.clone()).await;
        Ok(metrics)
    }

    /// `evaluateFairness(windowHours)`: both variants, capped at 168 hours.
    /// A store failure for one side zero-fills that side and the overall
    /// response still returns (spec §4.7 partial-failure semantics).
    pub async fn evaluate_fairness(&self, window_hours: u64) -> Result<FairnessComparison, RecError> {
        if window_hours > MAX_COMPARISON_WINDOW_HOURS {
            return Err(RecError::range_too_large(format!(
                "windowHours {window_hours} exceeds comparison cap of {MAX_COMPARISON_WINDOW_HOURS}"
            )));
        }
        let (control_result, treatment_result) = tokio::join!(
            self.exposure(window_hours, Some("control".to_string())),
            self.exposure(window_hours, Some("treatment".to_string())),
        );
        let control = control_result.unwrap_or_else(|err| {
            tracing::error!(%err, "fairness: control scan failed, zero-filling");
            Arc::new(ExposureMetrics::zeroed())
        });
        let treatment = treatment_result.unwrap_or_else(|err| {
            tracing::error!(%err, "fairness: treatment scan failed, zero-filling");
            Arc::new(ExposureMetrics::zeroed())
        });

        let exposure_fairness = if (control.gini - treatment.gini).abs() < 0.1 {
            FairnessVerdict::Fair
        } else {
            FairnessVerdict::Unfair
        };
        let diversity_comparison = if (control.diversity - treatment.diversity).abs() < 0.1 {
            DiversityVerdict::Similar
        } else {
            DiversityVerdict::Different
        };

        Ok(FairnessComparison {
            control: (*control).clone(),
            treatment: (*treatment).clone(),
            exposure_fairness,
            diversity_comparison,
        })
    }

    async fn scan(&self, window_hours: u64, variant: Option<&str>) -> Result<ExposureMetrics, RecError> {
        let now = chrono::Utc::now().timestamp_millis();
        let from = now - (window_hours as i64) * 3_600_000;
        let mut filter = EventFilter::default();
        filter.kind = Some(EventType::Recommend);
        filter.variant = variant.map(|v| v.to_string());
        let range = self.store.range_async(from, now, filter).await.map_err(RecError::from)?;
        Ok(metrics::compute(&range.events))
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

    fn recommend(variant: &str, items: Vec<&str>) -> RawEvent {
        RawEvent::new_recommend(
            "u1",
            0,
            RecommendPayload {
                items: items.into_iter().map(String::from).collect(),
                variant: Some(variant.to_string()),
                request_id: None,
                model_version: None,
                limit: None,
            },
        )
    }

    #[tokio::test]
    async fn rejects_window_over_raw_cap() {
        let analyzer = FairnessAnalyzer::new(store());
        let err = analyzer.exposure(721, None).await.unwrap_err();
        assert_eq!(err.category.code(), "range-too-large");
    }

    #[tokio::test]
    async fn rejects_comparison_window_over_168() {
        let analyzer = FairnessAnalyzer::new(store());
        let err = analyzer.evaluate_fairness(169).await.unwrap_err();
        assert_eq!(err.category.code(), "range-too-large");
    }

    #[tokio::test]
    async fn evaluate_fairness_compares_both_variants() {
        let store = store();
        store.append_async(recommend("control", vec!["a", "b"])).await.unwrap();
        store.append_async(recommend("treatment", vec!["a", "b"])).await.unwrap();
        let analyzer = FairnessAnalyzer::new(store);
        let comparison = analyzer.evaluate_fairness(24).await.unwrap();
        assert_eq!(comparison.exposure_fairness, FairnessVerdict::Fair);
    }
}
