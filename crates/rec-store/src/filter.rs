//! Range-scan filter (spec §4.2): `type`, `type ∈ set`, `userId`, `itemId`,
//! or `payload.variant`.

use rec_protocol::EventType;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kind: Option<EventType>,
    pub kinds: Option<HashSet<EventType>>,
    pub user_id: Option<String>,
    pub item_id: Option<String>,
    pub variant: Option<String>,
}

impl EventFilter {
    pub fn matches_kind(&self, kind: EventType) -> bool {
        if let Some(k) = self.kind {
            if k != kind {
                return false;
            }
        }
        if let Some(set) = &self.kinds {
            if !set.contains(&kind) {
                return false;
            }
        }
        true
    }
}
