mod file_config;

pub use file_config::{BackoffConfig, CircuitBreakerConfig, FileConfig, NotificationsConfig};

use crate::notifications::LogSettings;
use crate::polling::{BreakerSettings, DiffOptions, PollingSettings, RetryPolicy};
use crate::server::RequestsLoggingLevel;
use crate::user::{Viewer, ViewerRole};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_DETAIL_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_DB_PATH: &str = "notifications.db";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_sec: u64,
    pub viewer_id: Option<String>,
    pub viewer_role: Option<String>,
    pub poll_interval_ms: u64,
    pub detail_poll_interval_ms: u64,
    pub watch_ticket: Option<String>,
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub notify_assignments: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
            viewer_id: None,
            viewer_role: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            detail_poll_interval_ms: DEFAULT_DETAIL_POLL_INTERVAL_MS,
            watch_ticket: None,
            db_path: None,
            port: DEFAULT_PORT,
            logging_level: RequestsLoggingLevel::default(),
            notify_assignments: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_sec: u64,
    /// Viewer to start polling for at startup; otherwise started over the API.
    pub viewer: Option<Viewer>,
    pub poll_interval: Duration,
    pub detail_poll_interval: Duration,
    pub watch_ticket: Option<String>,
    pub db_path: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Feature configs (with defaults)
    pub notifications: NotificationSettings,
    pub backoff: BackoffSettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let api_base_url = file
            .api_base_url
            .or_else(|| cli.api_base_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "api_base_url must be specified via --api-base-url or in config file"
                )
            })?;
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            bail!("api_base_url must be an http(s) URL: {}", api_base_url);
        }

        let api_token = file.api_token.or_else(|| cli.api_token.clone());
        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than 0");
        }

        let viewer_id = file.viewer_id.or_else(|| cli.viewer_id.clone());
        let viewer_role = file.viewer_role.or_else(|| cli.viewer_role.clone());
        let viewer = match (viewer_id, viewer_role) {
            (Some(id), Some(role)) => {
                let role = ViewerRole::from_str(&role)
                    .ok_or_else(|| anyhow::anyhow!("Unknown viewer role: {}", role))?;
                Some(Viewer::new(id, role))
            }
            (None, None) => None,
            _ => bail!("viewer_id and viewer_role must be provided together"),
        };

        let poll_interval_ms = file.poll_interval_ms.unwrap_or(cli.poll_interval_ms);
        let detail_poll_interval_ms = file
            .detail_poll_interval_ms
            .unwrap_or(cli.detail_poll_interval_ms);
        if poll_interval_ms == 0 || detail_poll_interval_ms == 0 {
            bail!("Poll intervals must be greater than 0");
        }

        let watch_ticket = file.watch_ticket.or_else(|| cli.watch_ticket.clone());
        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        // Notification settings - merge file config with defaults
        let n_file = file.notifications.unwrap_or_default();
        let defaults = NotificationSettings::default();
        let notifications = NotificationSettings {
            capacity: n_file.capacity.unwrap_or(defaults.capacity),
            dedup_window_ms: n_file.dedup_window_ms.unwrap_or(defaults.dedup_window_ms),
            merge_on_persist: n_file.merge_on_persist.unwrap_or(defaults.merge_on_persist),
            toast_duration_ms: n_file
                .toast_duration_ms
                .unwrap_or(defaults.toast_duration_ms),
            notify_assignments: n_file
                .notify_assignments
                .unwrap_or(cli.notify_assignments),
        };
        if notifications.capacity == 0 {
            bail!("notifications.capacity must be greater than 0");
        }

        let b_file = file.backoff.unwrap_or_default();
        let defaults = BackoffSettings::default();
        let backoff = BackoffSettings {
            enabled: b_file.enabled.unwrap_or(defaults.enabled),
            initial_backoff_ms: b_file
                .initial_backoff_ms
                .unwrap_or(defaults.initial_backoff_ms),
            max_backoff_ms: b_file.max_backoff_ms.unwrap_or(defaults.max_backoff_ms),
            multiplier: b_file.multiplier.unwrap_or(defaults.multiplier),
            jitter_ratio: b_file.jitter_ratio.unwrap_or(defaults.jitter_ratio),
        };
        if backoff.multiplier < 1.0 {
            bail!("backoff.multiplier must be at least 1.0");
        }
        if !(0.0..1.0).contains(&backoff.jitter_ratio) {
            bail!("backoff.jitter_ratio must be in [0, 1)");
        }
        if backoff.max_backoff_ms < backoff.initial_backoff_ms {
            bail!("backoff.max_backoff_ms must not be lower than backoff.initial_backoff_ms");
        }

        let cb_file = file.circuit_breaker.unwrap_or_default();
        let defaults = CircuitBreakerSettings::default();
        let circuit_breaker = CircuitBreakerSettings {
            failure_threshold: cb_file
                .failure_threshold
                .unwrap_or(defaults.failure_threshold),
            cooldown_secs: cb_file.cooldown_secs.unwrap_or(defaults.cooldown_secs),
        };

        Ok(Self {
            api_base_url,
            api_token,
            request_timeout_sec,
            viewer,
            poll_interval: Duration::from_millis(poll_interval_ms),
            detail_poll_interval: Duration::from_millis(detail_poll_interval_ms),
            watch_ticket,
            db_path,
            port,
            logging_level,
            notifications,
            backoff,
            circuit_breaker,
        })
    }

    pub fn polling_settings(&self) -> PollingSettings {
        PollingSettings {
            interval: self.poll_interval,
            retry: RetryPolicy {
                enabled: self.backoff.enabled,
                initial_backoff: Duration::from_millis(self.backoff.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.backoff.max_backoff_ms),
                backoff_multiplier: self.backoff.multiplier,
                jitter_ratio: self.backoff.jitter_ratio,
            },
            breaker: BreakerSettings {
                failure_threshold: self.circuit_breaker.failure_threshold,
                cooldown: Duration::from_secs(self.circuit_breaker.cooldown_secs),
            },
            diff: DiffOptions {
                notify_assignments: self.notifications.notify_assignments,
            },
            ..Default::default()
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            capacity: self.notifications.capacity,
            dedup_window: Duration::from_millis(self.notifications.dedup_window_ms),
            merge_on_persist: self.notifications.merge_on_persist,
        }
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.notifications.toast_duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    pub capacity: usize,
    pub dedup_window_ms: u64,
    pub merge_on_persist: bool,
    pub toast_duration_ms: u64,
    pub notify_assignments: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            capacity: 50,
            dedup_window_ms: 5000,
            merge_on_persist: true,
            toast_duration_ms: 3000,
            notify_assignments: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffSettings {
    pub enabled: bool,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    pub jitter_ratio: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_backoff_ms: 1000,
            max_backoff_ms: 300_000, // 5 minutes
            multiplier: 2.0,
            jitter_ratio: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 60,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
