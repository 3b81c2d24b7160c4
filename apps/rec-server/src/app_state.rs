//! Shared application state handed to every handler, grounded in the
//! teacher's `AppState { kernel, bus, ... }` bundle-of-arcs pattern.

use rec_events::Bus;
use rec_experiments::ExperimentEngine;
use rec_fairness::FairnessAnalyzer;
use rec_feedback::FeedbackAnalyzer;
use rec_protocol::Config;
use rec_registry::Registry;
use rec_serving::ServingEngine;
use rec_store::EventStore;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<EventStore>,
    pub registry: Arc<Registry>,
    pub bus: Arc<Bus>,
    pub serving: Arc<ServingEngine>,
    pub experiments: Arc<ExperimentEngine>,
    pub fairness: Arc<FairnessAnalyzer>,
    pub feedback: Arc<FeedbackAnalyzer>,
    pub started_at: Instant,
}

impl AppState {
    pub fn is_admin_authorized(&self, provided_key: Option<&str>) -> bool {
        match &self.config.model_admin_api_key {
            Some(expected) => provided_key.is_some_and(|k| k == expected),
            None => false,
        }
    }
}
