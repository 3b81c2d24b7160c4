//! Per-item lifecycle tracking: `firstRecommended -> firstInteracted ->
//! secondRecommended`, the feedback-loop primitive (spec §4.8).

use rec_protocol::{EventType, RawEvent};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FeedbackLoop {
    pub item_id: String,
    pub first_recommended: i64,
    pub first_interacted: i64,
    pub second_recommended: i64,
    pub cycle_time_ms: i64,
}

#[derive(Default)]
struct ItemState {
    first_recommended: Option<i64>,
    first_interacted: Option<i64>,
    second_recommended: Option<i64>,
}

/// Scans `events` (sorted ascending by `ts` at this boundary, per spec §5)
/// and returns one [`FeedbackLoop`] per item that completed all three
/// milestones.
pub fn detect_loops(events: &[RawEvent]) -> Vec<FeedbackLoop> {
    let mut ordered: Vec<&RawEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.ts);

    let mut state: HashMap<String, ItemState> = HashMap::new();

    for event in ordered {
        match event.kind {
            EventType::Recommend => {
                for item in event.recommended_items() {
                    let entry = state.entry(item).or_default();
                    if entry.first_recommended.is_none() {
                        entry.first_recommended = Some(event.ts);
                    } else if entry.first_interacted.is_some() && entry.second_recommended.is_none() {
                        entry.second_recommended = Some(event.ts);
                    }
                }
            }
            EventType::Play | EventType::View => {
                if let Some(item_id) = &event.item_id {
                    if let Some(entry) = state.get_mut(item_id) {
                        if entry.first_recommended.is_some()
                            && entry.first_interacted.is_none()
                            && event.ts > entry.first_recommended.unwrap()
                        {
                            entry.first_interacted = Some(event.ts);
                        }
                    }
                }
            }
            EventType::Skip => {}
        }
    }

    let mut loops = Vec::new();
    for (item_id, entry) in state {
        if let (Some(first_rec), Some(first_int), Some(second_rec)) =
            (entry.first_recommended, entry.first_interacted, entry.second_recommended)
        {
            loops.push(FeedbackLoop {
                item_id,
                first_recommended: first_rec,
                first_interacted: first_int,
                second_recommended: second_rec,
                cycle_time_ms: second_rec - first_rec,
            });
        }
    }
    loops.sort_by(|a, b| a.item_id.cmp(&b.item_id));
    loops
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
    fn completes_loop_with_all_three_milestones() {
        let events = vec![
            recommend(0, vec!["a"]),
            RawEvent::new_interaction(EventType::Play, "u1", "a", 100),
            recommend(200, vec!["a"]),
        ];
        let loops = detect_loops(&events);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].cycle_time_ms, 200);
    }

    #[test]
    fn no_loop_without_second_recommendation() {
        let events = vec![recommend(0, vec!["a"]), RawEvent::new_interaction(EventType::Play, "u1", "a", 100)];
        let loops = detect_loops(&events);
        assert!(loops.is_empty());
    }
}
