//! C4 — Ingest Consumer: schema validation, dead-letter routing, and
//! concurrency-bounded backpressure over a [`rec_events::StreamingBus`].

mod backpressure;
mod consumer;

pub use backpressure::Backpressure;
pub use consumer::{Consumer, EventHandler};
