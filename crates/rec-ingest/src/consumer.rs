//! The ingest consumer loop: pulls raw JSON off a [`StreamingBus`],
//! validates, persists valid events to the event store, dead-letters
//! invalid ones, and forwards valid events to an optional in-process
//! handler (spec §4.4).

use crate::backpressure::Backpressure;
use rec_events::StreamingBus;
use rec_protocol::event::parse_ingest_message;
use rec_protocol::RawEvent;
use rec_store::EventStore;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Invoked once per successfully validated and persisted event. Forwarding
/// failures are logged only — they never affect ingest's own durability
/// guarantee (spec §4.4 "optionally, forwarded").
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &RawEvent);
}

pub struct Consumer {
    bus: Arc<dyn StreamingBus>,
    store: Arc<EventStore>,
    backpressure: Arc<Backpressure>,
    semaphore: Arc<Semaphore>,
    handler: Option<Arc<dyn EventHandler>>,
}

impl Consumer {
    pub fn new(
        bus: Arc<dyn StreamingBus>,
        store: Arc<EventStore>,
        concurrency: usize,
        topics: Vec<String>,
        handler: Option<Arc<dyn EventHandler>>,
    ) -> Self {
        Consumer {
            bus,
            store,
            backpressure: Arc::new(Backpressure::new(concurrency.max(1), topics)),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            handler,
        }
    }

    /// Runs until the bus yields `None` (stream closed). Each message is
    /// its own unit of work, scheduled under the concurrency cap.
    pub async fn run(&self) {
        loop {
            let Some(raw) = self.bus.recv().await else {
                break;
            };
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            self.backpressure.on_start(&self.bus).await;

            let store = self.store.clone();
            let handler = self.handler.clone();
            let backpressure = self.backpressure.clone();
            let bus = self.bus.clone();

            tokio::spawn(async move {
                let _permit = permit;
                process_one(&store, handler.as_deref(), raw).await;
                backpressure.on_finish(&bus).await;
            });
        }
    }

    pub fn inflight(&self) -> usize {
        self.backpressure.inflight()
    }
}

async fn process_one(store: &EventStore, handler: Option<&dyn EventHandler>, raw: serde_json::Value) {
    match parse_ingest_message(&raw) {
        Ok(event) => match store.append_async(event.clone()).await {
            Ok(_) => {
                if let Some(handler) = handler {
                    handler.handle(&event);
                }
            }
            Err(err) => {
                tracing::error!(%err, "ingest: persist failed, routing to dead-letter");
                let received_at = event.ts;
                let _ = store
                    .append_dead_letter_async(received_at, err.to_string(), raw)
                    .await;
            }
        },
        Err(reason) => {
            tracing::warn!(%reason, "ingest: schema validation failed");
            let received_at = raw.get("ts").and_then(|v| v.as_i64()).unwrap_or(0);
            if let Err(err) = store.append_dead_letter_async(received_at, reason, raw).await {
                tracing::error!(%err, "ingest: dead-letter write itself failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct QueueBus {
        queue: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl StreamingBus for QueueBus {
        async fn recv(&self) -> Option<serde_json::Value> {
            self.queue.lock().unwrap().pop()
        }
        async fn pause(&self, _topics: &[String]) {}
        async fn resume(&self, _topics: &[String]) {}
    }

    fn open_store() -> Arc<EventStore> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        std::mem::forget(dir);
        Arc::new(EventStore::open(&path, 10_000).unwrap())
    }

    #[tokio::test]
    async fn valid_message_is_persisted() {
        let store = open_store();
        let msg = serde_json::json!({
            "type": "view", "userId": "u1", "ts": 1, "payload": {"itemId": "i1"}
        });
        let bus: Arc<dyn StreamingBus> = Arc::new(QueueBus { queue: Mutex::new(vec![msg]) });
        let consumer = Consumer::new(bus, store.clone(), 2, vec!["events".to_string()], None);
        consumer.run().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let letters = store.list_dead_letters(10).unwrap();
        assert!(letters.is_empty());
    }

    #[tokio::test]
    async fn invalid_message_is_dead_lettered() {
        let store = open_store();
        let msg = serde_json::json!({"type": "bogus", "userId": "u1", "ts": 1});
        let bus: Arc<dyn StreamingBus> = Arc::new(QueueBus { queue: Mutex::new(vec![msg]) });
        let consumer = Consumer::new(bus, store.clone(), 2, vec!["events".to_string()], None);
        consumer.run().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let letters = store.list_dead_letters(10).unwrap();
        assert_eq!(letters.len(), 1);
    }
}
