//! Process startup: config load, store/registry open, engine wiring
//! (spec §4.9, §6 environment configuration).

use crate::app_state::AppState;
use rec_events::Bus;
use rec_experiments::ExperimentEngine;
use rec_fairness::FairnessAnalyzer;
use rec_feedback::FeedbackAnalyzer;
use rec_protocol::Config;
use rec_registry::Registry;
use rec_serving::ServingEngine;
use rec_store::EventStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub fn build_state(config: Config) -> anyhow::Result<AppState> {
    let event_store_path = config
        .event_store_db
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/events.sqlite"));
    let registry_path = PathBuf::from("data/registry.sqlite");

    let store = Arc::new(EventStore::open(&event_store_path, config.event_store_row_cap)?);
    let registry = Arc::new(Registry::open(&registry_path, Some(PathBuf::from("data/registry")))?);
    let bus = Arc::new(Bus::default());

    let serving = Arc::new(ServingEngine::new(
        registry.clone(),
        store.clone(),
        bus.clone(),
        config.pipeline_git_sha.clone(),
        config.container_image_digest.clone(),
    ));
    let experiments = Arc::new(ExperimentEngine::new(store.clone(), config.rec_success));
    let fairness = Arc::new(FairnessAnalyzer::new(store.clone()));
    let feedback = Arc::new(FeedbackAnalyzer::new(store.clone()));

    Ok(AppState {
        config: Arc::new(config),
        store,
        registry,
        bus,
        serving,
        experiments,
        fairness,
        feedback,
        started_at: Instant::now(),
    })
}
