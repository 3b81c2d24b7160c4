//! The in-process event bus (for fan-out of recommend/interaction events to
//! online-metrics hooks) and the [`StreamingBus`] trait the ingest consumer
//! reads from. Grounded in the teacher's `arw-events::Bus` publish/subscribe
//! shape, generalized to this system's two consumers.

pub mod topics;

use rec_protocol::RawEvent;
use tokio::sync::broadcast;

/// Minimal envelope carried on the in-process bus: just the raw event plus
/// the topic it was published on, mirroring the teacher's `Envelope { time,
/// kind, payload }` shape.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: &'static str,
    pub event: RawEvent,
}

/// Fan-out bus for events persisted by the ingest consumer or emitted by the
/// serving engine. Subscribers that can't keep up silently drop the oldest
/// entries (broadcast channel semantics) — acceptable here because the
/// event store, not the bus, is the durable record.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<Envelope>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Bus { sender }
    }

    pub fn publish(&self, topic: &'static str, event: RawEvent) {
        // A publish with no subscribers is not an error; the bus is
        // best-effort fan-out, not a durable log.
        let _ = self.sender.send(Envelope { topic, event });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new(1024)
    }
}

/// The interface the ingest consumer (C4) reads from. A real implementation
/// wraps a Kafka/NATS/etc. client; [`rec-ingest`]'s tests use an in-memory
/// one. `pause`/`resume` are the backpressure hooks spec §4.4 requires.
#[async_trait::async_trait]
pub trait StreamingBus: Send + Sync {
    /// Blocks until the next raw message is available, or `None` once the
    /// source is exhausted (used by tests; real brokers never return `None`).
    async fn recv(&self) -> Option<serde_json::Value>;
    async fn pause(&self, topics: &[String]);
    async fn resume(&self, topics: &[String]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_protocol::{EventType, RawEvent};

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let event = RawEvent::new_interaction(EventType::Play, "u1", "i1", 0);
        bus.publish(topics::RECOMMEND_EVENTS, event);
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.topic, topics::RECOMMEND_EVENTS);
    }
}
