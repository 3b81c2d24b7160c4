//! In-flight work tracker that pauses/resumes the bus at
//! `(pauseAt, resumeAt) = (5x, 2x)` concurrency thresholds (spec §4.4).

use rec_events::StreamingBus;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct Backpressure {
    inflight: AtomicUsize,
    paused: AtomicBool,
    pause_at: usize,
    resume_at: usize,
    topics: Vec<String>,
}

impl Backpressure {
    pub fn new(concurrency: usize, topics: Vec<String>) -> Self {
        Backpressure {
            inflight: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            pause_at: concurrency * 5,
            resume_at: concurrency * 2,
            topics,
        }
    }

    /// Called when a unit of work is accepted; may pause the bus.
    pub async fn on_start(&self, bus: &Arc<dyn StreamingBus>) {
        let inflight = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
        if inflight > self.pause_at && !self.paused.swap(true, Ordering::SeqCst) {
            tracing::warn!(inflight, pause_at = self.pause_at, "ingest backpressure: pausing bus");
            bus.pause(&self.topics).await;
        }
    }

    /// Called when a unit of work completes; may resume the bus.
    pub async fn on_finish(&self, bus: &Arc<dyn StreamingBus>) {
        let inflight = self.inflight.fetch_sub(1, Ordering::SeqCst) - 1;
        if inflight < self.resume_at && self.paused.swap(false, Ordering::SeqCst) {
            tracing::info!(inflight, resume_at = self.resume_at, "ingest backpressure: resuming bus");
            bus.resume(&self.topics).await;
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingBus {
        events: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl StreamingBus for RecordingBus {
        async fn recv(&self) -> Option<serde_json::Value> {
            None
        }
        async fn pause(&self, _topics: &[String]) {
            self.events.lock().unwrap().push("pause");
        }
        async fn resume(&self, _topics: &[String]) {
            self.events.lock().unwrap().push("resume");
        }
    }

    #[tokio::test]
    async fn pauses_at_5x_and_resumes_at_2x() {
        let bus: Arc<dyn StreamingBus> = Arc::new(RecordingBus { events: Mutex::new(vec![]) });
        let bp = Backpressure::new(2, vec!["topic".to_string()]);
        for _ in 0..11 {
            bp.on_start(&bus).await;
        }
        assert!(bp.is_paused());
        for _ in 0..8 {
            bp.on_finish(&bus).await;
        }
        assert!(!bp.is_paused());
    }
}
