//! Environment configuration (spec §6), loaded once at process startup.

use std::time::Duration;

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub event_store_uri: Option<String>,
    pub event_store_db: Option<String>,
    pub bus_broker: Option<String>,
    pub bus_topic: Option<String>,
    pub bus_key: Option<String>,
    pub bus_secret: Option<String>,
    pub bus_group_id: Option<String>,
    pub bus_sasl_mechanism: Option<String>,
    pub rec_success: Duration,
    pub online_metric_window: Duration,
    pub model_admin_api_key: Option<String>,
    pub pipeline_git_sha: String,
    pub container_image_digest: String,
    pub event_store_row_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config::from_env()
    }
}

impl Config {
    /// Reads every variable spec.md §6 enumerates, falling back to the
    /// documented defaults (`REC_SUCCESS_MINUTES` = 15,
    /// `ONLINE_METRIC_WINDOW_MIN` = 30, row cap = 100,000).
    pub fn from_env() -> Self {
        Config {
            event_store_uri: env_string("EVENT_STORE_URI"),
            event_store_db: env_string("EVENT_STORE_DB"),
            bus_broker: env_string("BUS_BROKER"),
            bus_topic: env_string("BUS_TOPIC"),
            bus_key: env_string("BUS_KEY"),
            bus_secret: env_string("BUS_SECRET"),
            bus_group_id: env_string("BUS_GROUP_ID"),
            bus_sasl_mechanism: env_string("BUS_SASL_MECHANISM"),
            rec_success: Duration::from_secs(env_parsed::<u64>("REC_SUCCESS_MINUTES", 15) * 60),
            online_metric_window: Duration::from_secs(
                env_parsed::<u64>("ONLINE_METRIC_WINDOW_MIN", 30) * 60,
            ),
            model_admin_api_key: env_string("MODEL_ADMIN_API_KEY"),
            pipeline_git_sha: env_string("PIPELINE_GIT_SHA").unwrap_or_else(|| "unknown".into()),
            container_image_digest: env_string("CONTAINER_IMAGE_DIGEST")
                .unwrap_or_else(|| "unknown".into()),
            event_store_row_cap: env_parsed("EVENT_STORE_ROW_CAP", 100_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        // SAFETY: test runs single-threaded w.r.t. these specific keys.
        std::env::remove_var("REC_SUCCESS_MINUTES");
        std::env::remove_var("ONLINE_METRIC_WINDOW_MIN");
        let cfg = Config::from_env();
        assert_eq!(cfg.rec_success, Duration::from_secs(15 * 60));
        assert_eq!(cfg.online_metric_window, Duration::from_secs(30 * 60));
        assert_eq!(cfg.event_store_row_cap, 100_000);
    }
}
