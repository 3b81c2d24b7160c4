//! Top-N scoring over an artifact's popularity counts (spec §4.5 step 4).

use rec_protocol::trace::ScoredItem;
use std::collections::HashMap;

/// Sorts `(itemId, score)` pairs by score descending, itemId ascending on
/// ties, and takes the first `n`.
pub fn top_n(counts: &HashMap<String, f64>, n: usize) -> Vec<ScoredItem> {
    let mut items: Vec<ScoredItem> = counts
        .iter()
        .map(|(item_id, score)| ScoredItem {
            item_id: item_id.clone(),
            score: *score,
        })
        .collect();
    items.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    items.truncate(n);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_score_desc_then_item_id_asc() {
        let mut counts = HashMap::new();
        counts.insert("b".to_string(), 5.0);
        counts.insert("a".to_string(), 5.0);
        counts.insert("c".to_string(), 10.0);
        let ranked = top_n(&counts, 3);
        assert_eq!(
            ranked.iter().map(|i| i.item_id.as_str()).collect::<Vec<_>>(),
            vec!["c", "a", "b"]
        );
    }

    #[test]
    fn truncates_to_n() {
        let mut counts = HashMap::new();
        for i in 0..10 {
            counts.insert(format!("item-{i}"), i as f64);
        }
        assert_eq!(top_n(&counts, 3).len(), 3);
    }
}
