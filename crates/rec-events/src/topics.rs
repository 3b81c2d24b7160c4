//! Bus topic names, centralized the way the teacher's `arw-topics` crate
//! centralizes its event-kind strings.

pub const RECOMMEND_EVENTS: &str = "rec.events";
pub const INGEST_DEAD_LETTER: &str = "rec.ingest.dead_letter";
pub const BACKPRESSURE: &str = "rec.ingest.backpressure";
pub const SERVING_STATE_CHANGED: &str = "rec.registry.serving_state_changed";
