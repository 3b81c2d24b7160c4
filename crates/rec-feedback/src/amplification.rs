//! Amplification ratios: per-item before/after-first-recommendation
//! interaction split (spec §4.8).

use rec_protocol::{EventType, RawEvent};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Finite(f64),
    Infinite,
}

#[derive(Debug, Clone)]
pub struct AmplificationEntry {
    pub item_id: String,
    pub before: u64,
    pub after: u64,
    pub ratio: Ratio,
}

pub fn compute(events: &[RawEvent]) -> Vec<AmplificationEntry> {
    let mut ordered: Vec<&RawEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.ts);

    let mut first_rec: HashMap<String, i64> = HashMap::new();
    for event in &ordered {
        if event.kind == EventType::Recommend {
            for item in event.recommended_items() {
                first_rec.entry(item).or_insert(event.ts);
            }
        }
    }

    let mut before: HashMap<String, u64> = HashMap::new();
    let mut after: HashMap<String, u64> = HashMap::new();
    for event in &ordered {
        if !matches!(event.kind, EventType::Play | EventType::View) {
            continue;
        }
        let Some(item_id) = &event.item_id else { continue };
        let Some(&t0) = first_rec.get(item_id) else { continue };
        if event.ts < t0 {
            *before.entry(item_id.clone()).or_insert(0) += 1;
        } else {
            *after.entry(item_id.clone()).or_insert(0) += 1;
        }
    }

    let mut items: Vec<String> = first_rec.keys().cloned().collect();
    items.sort();

    items
        .into_iter()
        .map(|item_id| {
            let b = before.get(&item_id).copied().unwrap_or(0);
            let a = after.get(&item_id).copied().unwrap_or(0);
            let ratio = if b == 0 {
                if a > 0 { Ratio::Infinite } else { Ratio::Finite(0.0) }
            } else {
                Ratio::Finite(a as f64 / b as f64)
            };
            AmplificationEntry { item_id, before: b, after: a, ratio }
        })
        .collect()
}

pub fn mean_finite_ratio(entries: &[AmplificationEntry]) -> f64 {
    let finite: Vec<f64> = entries
        .iter()
        .filter_map(|e| match e.ratio {
            Ratio::Finite(r) => Some(r),
            Ratio::Infinite => None,
        })
        .collect();
    if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

pub fn top_10_by_ratio(entries: &[AmplificationEntry]) -> Vec<AmplificationEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| ratio_value(b.ratio).partial_cmp(&ratio_value(a.ratio)).unwrap());
    sorted.truncate(10);
    sorted
}

fn ratio_value(ratio: Ratio) -> f64 {
    match ratio {
        Ratio::Finite(r) => r,
        Ratio::Infinite => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::event::RecommendPayload;

    fn recommend(ts: i64, items: Vec<&str>) -> RawEvent {
        RawEvent::new_recommend(
            "u1",
            ts,
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
    fn before_zero_after_positive_is_infinite() {
        let events = vec![recommend(100, vec!["a"]), RawEvent::new_interaction(EventType::Play, "u1", "a", 200)];
        let entries = compute(&events);
        assert_eq!(entries[0].ratio, Ratio::Infinite);
    }

    #[test]
    fn before_and_after_both_present_gives_finite_ratio() {
        let events = vec![
            RawEvent::new_interaction(EventType::Play, "u1", "a", 0),
            recommend(100, vec!["a"]),
            RawEvent::new_interaction(EventType::Play, "u1", "a", 200),
        ];
        let entries = compute(&events);
        assert_eq!(entries[0].ratio, Ratio::Finite(1.0));
    }

    #[test]
    fn mean_excludes_infinite_ratios() {
        let events = vec![recommend(100, vec!["a", "b"]), RawEvent::new_interaction(EventType::Play, "u1", "a", 200)];
        let entries = compute(&events);
        assert_eq!(mean_finite_ratio(&entries), 0.0);
    }
}
