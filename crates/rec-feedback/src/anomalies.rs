//! Anomaly flags derived from feedback loops and amplification (spec §4.8).

use crate::amplification::{AmplificationEntry, Ratio};
use crate::lifecycle::FeedbackLoop;
use serde::Serialize;

const ONE_HOUR_MS: i64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub kind: &'static str,
    pub severity: Severity,
    pub item_id: Option<String>,
    pub detail: String,
}

pub fn detect(
    loops: &[FeedbackLoop],
    amplification: &[AmplificationEntry],
    rec_slot_counts: &std::collections::HashMap<String, u64>,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    for feedback_loop in loops {
        if feedback_loop.cycle_time_ms < ONE_HOUR_MS {
            anomalies.push(Anomaly {
                kind: "short_feedback_cycle",
                severity: Severity::High,
                item_id: Some(feedback_loop.item_id.clone()),
                detail: format!("cycle time {}ms is under the 1h threshold", feedback_loop.cycle_time_ms),
            });
        }
    }

    for entry in amplification {
        if let Ratio::Finite(r) = entry.ratio {
            if r > 10.0 {
                anomalies.push(Anomaly {
                    kind: "extreme_amplification",
                    severity: Severity::Medium,
                    item_id: Some(entry.item_id.clone()),
                    detail: format!("amplification ratio {r:.2} exceeds 10x"),
                });
            }
        }
    }

    let total_slots: u64 = rec_slot_counts.values().sum();
    if total_slots > 0 {
        let mut by_count: Vec<(&String, &u64)> = rec_slot_counts.iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(a.1));
        let top_10_sum: u64 = by_count.iter().take(10).map(|(_, c)| **c).sum();
        if top_10_sum as f64 / total_slots as f64 > 0.5 {
            anomalies.push(Anomaly {
                kind: "high_concentration",
                severity: Severity::Medium,
                item_id: None,
                detail: format!(
                    "top-10 items carry {:.1}% of recommendation slots",
                    100.0 * top_10_sum as f64 / total_slots as f64
                ),
            });
        }
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn short_cycle_flagged_high_severity() {
        let loops = vec![FeedbackLoop {
            item_id: "a".into(),
            first_recommended: 0,
            first_interacted: 100,
            second_recommended: 1000,
            cycle_time_ms: 1000,
        }];
        let anomalies = detect(&loops, &[], &HashMap::new());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, Severity::High);
    }

    #[test]
    fn extreme_amplification_flagged_medium() {
        let entries = vec![AmplificationEntry {
            item_id: "a".into(),
            before: 1,
            after: 20,
            ratio: Ratio::Finite(20.0),
        }];
        let anomalies = detect(&[], &entries, &HashMap::new());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, Severity::Medium);
    }

    #[test]
    fn high_concentration_flagged_when_top_10_exceed_half() {
        let mut counts = HashMap::new();
        counts.insert("a".to_string(), 90u64);
        counts.insert("b".to_string(), 10u64);
        let anomalies = detect(&[], &[], &counts);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, "high_concentration");
    }

    #[test]
    fn no_anomalies_for_clean_data() {
        let anomalies = detect(&[], &[], &HashMap::new());
        assert!(anomalies.is_empty());
    }
}
