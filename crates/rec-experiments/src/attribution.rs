//! Event attribution within a success window (spec §4.6, "the core
//! invariant"). REQUIRES strict `ts`-ascending consumption; callers that
//! can't guarantee ordering from their source must sort first, which is
//! exactly what this module does at its boundary (spec §5).

use rec_protocol::{EventType, RawEvent};
use std::collections::HashMap;

struct Window {
    items: Vec<String>,
    expires: i64,
    variant: String,
}

#[derive(Debug, Clone, Default)]
pub struct VariantCounts {
    pub exposures: u64,
    pub successes: u64,
}

/// Runs the attribution scan over `events`, which need not already be
/// sorted. `success_window_ms` is `recSuccessMs` (spec's configurable
/// window length).
pub fn attribute(events: &[RawEvent], success_window_ms: i64) -> HashMap<String, VariantCounts> {
    let mut ordered: Vec<&RawEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.ts);

    let mut counts: HashMap<String, VariantCounts> = HashMap::new();
    let mut windows: HashMap<String, Window> = HashMap::new();

    for event in ordered {
        match event.kind {
            EventType::Recommend => {
                let Some(variant) = event.variant() else { continue };
                counts.entry(variant.to_string()).or_default().exposures += 1;
                windows.insert(
                    event.user_id.clone(),
                    Window {
                        items: event.recommended_items(),
                        expires: event.ts + success_window_ms,
                        variant: variant.to_string(),
                    },
                );
            }
            EventType::Play | EventType::View => {
                let Some(item_id) = &event.item_id else { continue };
                let Some(window) = windows.get(&event.user_id) else { continue };
                if event.ts > window.expires {
                    windows.remove(&event.user_id);
                    continue;
                }
                if window.items.is_empty() || window.items.contains(item_id) {
                    counts.entry(window.variant.clone()).or_default().successes += 1;
                    windows.remove(&event.user_id);
                }
            }
            EventType::Skip => {}
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::event::RecommendPayload;

    fn recommend(user: &str, ts: i64, variant: &str, items: Vec<&str>) -> RawEvent {
        RawEvent::new_recommend(
            user,
            ts,
            RecommendPayload {
                items: items.into_iter().map(String::from).collect(),
                variant: Some(variant.to_string()),
                request_id: None,
                model_version: None,
                limit: None,
            },
        )
    }

    #[test]
    fn credits_success_within_window() {
        let events = vec![
            recommend("u1", 0, "control", vec!["a", "b"]),
            RawEvent::new_interaction(EventType::Play, "u1", "a", 500),
        ];
        let counts = attribute(&events, 1000);
        let control = counts.get("control").unwrap();
        assert_eq!(control.exposures, 1);
        assert_eq!(control.successes, 1);
    }

    #[test]
    fn expiry_without_credit_drops_window() {
        let events = vec![
            recommend("u1", 0, "control", vec!["a"]),
            RawEvent::new_interaction(EventType::Play, "u1", "a", 2000),
        ];
        let counts = attribute(&events, 1000);
        let control = counts.get("control").unwrap();
        assert_eq!(control.successes, 0);
    }

    #[test]
    fn later_recommend_overwrites_earlier_window() {
        let events = vec![
            recommend("u1", 0, "control", vec!["a"]),
            recommend("u1", 10, "treatment", vec!["b"]),
            RawEvent::new_interaction(EventType::Play, "u1", "a", 50),
        ];
        let counts = attribute(&events, 1000);
        assert_eq!(counts.get("control").unwrap().successes, 0);
        assert_eq!(counts.get("treatment").unwrap().successes, 0);
    }

    #[test]
    fn empty_items_credits_any_interaction() {
        let events = vec![
            recommend("u1", 0, "control", vec![]),
            RawEvent::new_interaction(EventType::View, "u1", "anything", 10),
        ];
        let counts = attribute(&events, 1000);
        assert_eq!(counts.get("control").unwrap().successes, 1);
    }
}
