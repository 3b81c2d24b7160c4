//! Pure math over a stream of `recommend` events: exposure share,
//! intra-list diversity, coverage, Shannon entropy, Gini (spec §4.7).

use rec_protocol::RawEvent;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct ExposureMetrics {
    pub exposure_share: HashMap<String, f64>,
    pub diversity: f64,
    pub coverage: u64,
    pub entropy: f64,
    pub gini: f64,
}

impl ExposureMetrics {
    pub fn zeroed() -> Self {
        ExposureMetrics {
            exposure_share: HashMap::new(),
            diversity: 0.0,
            coverage: 0,
            entropy: 0.0,
            gini: 0.0,
        }
    }
}

pub fn compute(events: &[RawEvent]) -> ExposureMetrics {
    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut total: u64 = 0;
    let mut diversity_sum = 0.0;
    let mut diversity_n = 0u64;

    for event in events {
        let items = event.recommended_items();
        let k = items.len();
        if k == 0 {
            continue;
        }
        for item in &items {
            *counts.entry(item.clone()).or_insert(0) += 1;
            total += 1;
        }
        let diversity = if k == 1 {
            0.0
        } else {
            let distinct: std::collections::HashSet<&String> = items.iter().collect();
            distinct.len() as f64 / k as f64
        };
        diversity_sum += diversity;
        diversity_n += 1;
    }

    if total == 0 {
        return ExposureMetrics::zeroed();
    }

    let exposure_share: HashMap<String, f64> = counts
        .iter()
        .map(|(item, count)| (item.clone(), *count as f64 / total as f64))
        .collect();

    let coverage = counts.len() as u64;

    let entropy = -exposure_share
        .values()
        .map(|p| if *p > 0.0 { p * p.log2() } else { 0.0 })
        .sum::<f64>();

    let gini = gini_coefficient(exposure_share.values().copied());

    ExposureMetrics {
        exposure_share,
        diversity: if diversity_n > 0 { diversity_sum / diversity_n as f64 } else { 0.0 },
        coverage,
        entropy,
        gini,
    }
}

/// `G = Σᵢⱼ |xᵢ − xⱼ| / (2 n² x̄)` over sorted-ascending positive shares;
/// empty distribution is 0.
fn gini_coefficient(shares: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = shares.filter(|x| *x > 0.0).collect();
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let mut abs_diff_sum = 0.0;
    for &xi in &values {
        for &xj in &values {
            abs_diff_sum += (xi - xj).abs();
        }
    }
    abs_diff_sum / (2.0 * n * n * mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::event::RecommendPayload;

    fn recommend(items: Vec<&str>) -> RawEvent {
        RawEvent::new_recommend(
            "u1",
            0,
            RecommendPayload {
                items: items.into_iter().map(String::from).collect(),
                variant: None,
                request_id: None,
                model_version: None,
                limit: None,
            },
        )
    }

    #[test]
    fn single_item_list_has_zero_diversity() {
        let metrics = compute(&[recommend(vec!["a"])]);
        assert_eq!(metrics.diversity, 0.0);
    }

    #[test]
    fn perfectly_even_distribution_has_zero_gini() {
        let metrics = compute(&[recommend(vec!["a", "b"]), recommend(vec!["a", "b"])]);
        assert!(metrics.gini.abs() < 1e-9);
    }

    #[test]
    fn skewed_distribution_has_positive_gini() {
        let metrics = compute(&[
            recommend(vec!["a"]),
            recommend(vec!["a"]),
            recommend(vec!["a"]),
            recommend(vec!["b"]),
        ]);
        assert!(metrics.gini > 0.0);
    }

    #[test]
    fn coverage_counts_distinct_items() {
        let metrics = compute(&[recommend(vec!["a", "b"]), recommend(vec!["b", "c"])]);
        assert_eq!(metrics.coverage, 3);
    }

    #[test]
    fn empty_events_are_zeroed() {
        let metrics = compute(&[]);
        assert_eq!(metrics.coverage, 0);
        assert_eq!(metrics.gini, 0.0);
    }
}
