use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;
use crate::notifications::{NotificationLog, ToastChannel};
use crate::polling::PollingEngine;

pub type GuardedNotificationLog = Arc<NotificationLog>;
pub type GuardedPollingEngine = Arc<PollingEngine>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub engine: GuardedPollingEngine,
    pub log: GuardedNotificationLog,
    pub toasts: ToastChannel,
}

impl ServerState {
    /// Build the state around an engine, sharing its log and toast channel.
    pub fn new(config: ServerConfig, engine: GuardedPollingEngine) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            log: engine.log().clone(),
            toasts: engine.toasts().clone(),
            engine,
        }
    }
}

impl FromRef<ServerState> for GuardedNotificationLog {
    fn from_ref(input: &ServerState) -> Self {
        input.log.clone()
    }
}

impl FromRef<ServerState> for GuardedPollingEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}

impl FromRef<ServerState> for ToastChannel {
    fn from_ref(input: &ServerState) -> Self {
        input.toasts.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
