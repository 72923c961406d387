use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_sec: Option<u64>,
    pub viewer_id: Option<String>,
    pub viewer_role: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub detail_poll_interval_ms: Option<u64>,
    pub watch_ticket: Option<String>,
    pub db_path: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,

    // Feature configs
    pub notifications: Option<NotificationsConfig>,
    pub backoff: Option<BackoffConfig>,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    pub capacity: Option<usize>,
    pub dedup_window_ms: Option<u64>,
    pub merge_on_persist: Option<bool>,
    pub toast_duration_ms: Option<u64>,
    pub notify_assignments: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BackoffConfig {
    pub enabled: Option<bool>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub multiplier: Option<f64>,
    pub jitter_ratio: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Zero disables the breaker.
    pub failure_threshold: Option<u32>,
    pub cooldown_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
