//! The raw behavioral event — the atom of the system (spec §3).

use serde::{Deserialize, Serialize};

/// The four event types the attribution, fairness, and feedback-loop
/// analyzers understand. Anything else is rejected at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Recommend,
    Play,
    View,
    Skip,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Recommend => "recommend",
            EventType::Play => "play",
            EventType::View => "view",
            EventType::Skip => "skip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recommend" => Some(EventType::Recommend),
            "play" => Some(EventType::Play),
            "view" => Some(EventType::View),
            "skip" => Some(EventType::Skip),
            _ => None,
        }
    }

    /// Whether an interaction of this type can close a recommendation
    /// window (spec §4.6 attribution).
    pub fn is_success_signal(self) -> bool {
        matches!(self, EventType::Play | EventType::View)
    }
}

/// `payload.items` accepts both bare string ids and `{itemId}` objects
/// (spec §9 "Dynamic payloads"); this is the single normalized shape the
/// rest of the core ever sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum RawItem {
    Id(String),
    Object { #[serde(rename = "itemId")] item_id: String },
}

impl RawItem {
    fn into_id(self) -> String {
        match self {
            RawItem::Id(id) => id,
            RawItem::Object { item_id } => item_id,
        }
    }
}

/// Normalized payload for a `recommend` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendPayload {
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Wire shape used only to deserialize the `recommend` payload before
/// normalizing its `items` field; never exposed outside this module.
#[derive(Deserialize)]
struct RawRecommendPayload {
    #[serde(default)]
    items: Vec<RawItem>,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default, rename = "requestId")]
    request_id: Option<String>,
    #[serde(default, rename = "modelVersion")]
    model_version: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

impl From<RawRecommendPayload> for RecommendPayload {
    fn from(raw: RawRecommendPayload) -> Self {
        RecommendPayload {
            items: raw.items.into_iter().map(RawItem::into_id).collect(),
            variant: raw.variant,
            request_id: raw.request_id,
            model_version: raw.model_version,
            limit: raw.limit,
        }
    }
}

/// A behavioral event as persisted by the event store. `items` is present
/// only on the `recommend` arm; `item_id` is present on the interaction arms.
/// Represented as a tagged union over `kind` rather than a single struct
/// with optional fields, per spec §9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default, rename = "itemId", skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Wall-clock instant, milliseconds since the Unix epoch. Ordering is by
    /// `ts`, ties broken by insertion order (spec §3).
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommend: Option<RecommendPayload>,
}

impl RawEvent {
    pub fn new_recommend(user_id: impl Into<String>, ts: i64, payload: RecommendPayload) -> Self {
        RawEvent {
            kind: EventType::Recommend,
            user_id: user_id.into(),
            item_id: None,
            ts,
            recommend: Some(payload),
        }
    }

    pub fn new_interaction(
        kind: EventType,
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        ts: i64,
    ) -> Self {
        RawEvent {
            kind,
            user_id: user_id.into(),
            item_id: Some(item_id.into()),
            ts,
            recommend: None,
        }
    }

    /// The variant tag carried by a `recommend` event's payload, if any.
    pub fn variant(&self) -> Option<&str> {
        self.recommend.as_ref().and_then(|p| p.variant.as_deref())
    }

    /// The item ids this `recommend` event exposed, unioned with a bare
    /// `item_id` if one was also set (spec §4.6: `items := payload items ∪
    /// evt.itemId?`).
    pub fn recommended_items(&self) -> Vec<String> {
        let mut items = self
            .recommend
            .as_ref()
            .map(|p| p.items.clone())
            .unwrap_or_default();
        if let Some(id) = &self.item_id {
            if !items.contains(id) {
                items.push(id.clone());
            }
        }
        items
    }
}

/// Validates and normalizes a raw ingest message into a [`RawEvent`].
/// Required: `type`, `userId`, `ts`; `type` must be one of the allowed
/// values; `recommend` events must carry `items`; interaction events must
/// carry `itemId` (spec §4.4).
pub fn parse_ingest_message(raw: &serde_json::Value) -> Result<RawEvent, String> {
    let kind_str = raw
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing field `type`".to_string())?;
    let kind = EventType::parse(kind_str)
        .ok_or_else(|| format!("unknown event type `{kind_str}`"))?;
    let user_id = raw
        .get("userId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing field `userId`".to_string())?
        .to_string();
    let ts = raw
        .get("ts")
        .and_then(parse_ts)
        .ok_or_else(|| "missing or unparseable field `ts`".to_string())?;

    match kind {
        EventType::Recommend => {
            let payload_raw = raw
                .get("payload")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));
            let raw_payload: RawRecommendPayload = serde_json::from_value(payload_raw)
                .map_err(|e| format!("invalid recommend payload: {e}"))?;
            let payload: RecommendPayload = raw_payload.into();
            if payload.items.is_empty() {
                return Err("recommend payload must carry non-empty `items`".to_string());
            }
            Ok(RawEvent::new_recommend(user_id, ts, payload))
        }
        EventType::Play | EventType::View => {
            let item_id = raw
                .get("payload")
                .and_then(|p| p.get("itemId"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| format!("{} payload must carry `itemId`", kind.as_str()))?
                .to_string();
            Ok(RawEvent::new_interaction(kind, user_id, item_id, ts))
        }
        EventType::Skip => {
            let item_id = raw
                .get("payload")
                .and_then(|p| p.get("itemId"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            Ok(RawEvent {
                kind,
                user_id,
                item_id,
                ts,
                recommend: None,
            })
        }
    }
}

fn parse_ts(v: &serde_json::Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(s) = v.as_str() {
        return chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_mixed_item_shapes() {
        let msg = json!({
            "type": "recommend",
            "userId": "u1",
            "ts": 1_700_000_000_000i64,
            "payload": {"items": ["a", {"itemId": "b"}], "variant": "control"}
        });
        let event = parse_ingest_message(&msg).unwrap();
        assert_eq!(event.recommend.unwrap().items, vec!["a", "b"]);
    }

    #[test]
    fn rejects_unknown_type() {
        let msg = json!({"type": "purchase", "userId": "u1", "ts": 1});
        assert!(parse_ingest_message(&msg).is_err());
    }

    #[test]
    fn rejects_interaction_without_item_id() {
        let msg = json!({"type": "play", "userId": "u1", "ts": 1, "payload": {}});
        assert!(parse_ingest_message(&msg).is_err());
    }

    #[test]
    fn accepts_rfc3339_ts() {
        let msg = json!({
            "type": "view", "userId": "u1", "ts": "2024-01-01T00:00:00Z",
            "payload": {"itemId": "x"}
        });
        assert!(parse_ingest_message(&msg).is_ok());
    }
}
