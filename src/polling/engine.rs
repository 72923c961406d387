//! The notification polling engine.
//!
//! One background task per running engine fetches the viewer's tickets,
//! diffs them against the previous snapshot and records the resulting
//! notifications. The next cycle is only scheduled once the current one is
//! done, so cycles never overlap.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::circuit_breaker::{BreakerSettings, BreakerState, CircuitBreaker};
use super::diff::DiffOptions;
use super::poller::Poller;
use super::retry_policy::RetryPolicy;
use crate::notifications::{
    InMemoryNotificationStore, NotificationDraft, NotificationLog, NotificationStore, ToastChannel,
    ToastKind,
};
use crate::tickets::{FetchError, Ticket, TicketQuery, TicketSource};
use crate::user::Viewer;

/// Opens the notification store that belongs to a viewer.
pub type ViewerStores =
    Arc<dyn Fn(&Viewer) -> anyhow::Result<Arc<dyn NotificationStore>> + Send + Sync>;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone)]
pub struct PollingSettings {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    pub retry: RetryPolicy,
    pub breaker: BreakerSettings,
    pub diff: DiffOptions,
    /// Filters sent with every list fetch.
    pub query: TicketQuery,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            breaker: BreakerSettings::default(),
            diff: DiffOptions::default(),
            query: TicketQuery::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineState {
    Idle,
    /// Waiting for the first successful fetch.
    Baselining,
    Polling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: EngineState,
    pub viewer: Option<Viewer>,
    pub generation: u64,
    pub consecutive_failures: u32,
    pub breaker: BreakerState,
    pub tracked_tickets: usize,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl EngineStatus {
    fn idle(generation: u64) -> Self {
        Self {
            state: EngineState::Idle,
            viewer: None,
            generation,
            consecutive_failures: 0,
            breaker: BreakerState::Closed,
            tracked_tickets: 0,
            last_poll_at: None,
            last_error: None,
        }
    }
}

struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct EngineInner {
    source: Arc<dyn TicketSource>,
    log: Arc<NotificationLog>,
    toasts: ToastChannel,
    settings: PollingSettings,
    viewer_stores: Option<ViewerStores>,
    /// Viewer whose notifications the log currently holds.
    log_owner: Mutex<Option<String>>,
    generation: AtomicU64,
    run: Mutex<Option<RunHandle>>,
    status: Mutex<EngineStatus>,
    /// Held while a notification is recorded; `stop` waits on it.
    emitting: Mutex<()>,
}

/// Polls the ticket store on behalf of one viewer at a time.
///
/// `start` and `stop` must be called from within a tokio runtime.
pub struct PollingEngine {
    inner: Arc<EngineInner>,
}

impl PollingEngine {
    /// Engine whose log is shared by every viewer it is started for.
    pub fn new(
        source: Arc<dyn TicketSource>,
        log: Arc<NotificationLog>,
        toasts: ToastChannel,
        settings: PollingSettings,
    ) -> Self {
        Self::build(source, log, toasts, settings, None)
    }

    /// Engine that keeps one notification history per viewer: starting for
    /// a viewer other than the log's current owner moves the log onto the
    /// store returned by `viewer_stores`.
    pub fn with_viewer_stores(
        source: Arc<dyn TicketSource>,
        log: Arc<NotificationLog>,
        toasts: ToastChannel,
        settings: PollingSettings,
        viewer_stores: ViewerStores,
    ) -> Self {
        Self::build(source, log, toasts, settings, Some(viewer_stores))
    }

    fn build(
        source: Arc<dyn TicketSource>,
        log: Arc<NotificationLog>,
        toasts: ToastChannel,
        settings: PollingSettings,
        viewer_stores: Option<ViewerStores>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                source,
                log,
                toasts,
                settings,
                viewer_stores,
                log_owner: Mutex::new(None),
                generation: AtomicU64::new(0),
                run: Mutex::new(None),
                status: Mutex::new(EngineStatus::idle(0)),
                emitting: Mutex::new(()),
            }),
        }
    }

    pub fn log(&self) -> &Arc<NotificationLog> {
        &self.inner.log
    }

    pub fn toasts(&self) -> &ToastChannel {
        &self.inner.toasts
    }

    /// Start polling for `viewer`. Does nothing if already running.
    ///
    /// Returns whether a new run was started.
    pub fn start(&self, viewer: Viewer) -> bool {
        let mut run = self.inner.run.lock().unwrap();
        if let Some(handle) = run.as_ref() {
            if !handle.task.is_finished() {
                debug!("Polling engine already running, ignoring start");
                return false;
            }
        }
        self.inner.switch_log_owner(&viewer);

        let generation = {
            let mut status = self.inner.status.lock().unwrap();
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *status = EngineStatus {
                state: EngineState::Baselining,
                viewer: Some(viewer.clone()),
                ..EngineStatus::idle(generation)
            };
            generation
        };

        info!(
            "Starting notification polling for {} ({}), generation {}",
            viewer.id, viewer.role, generation
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            self.inner.clone(),
            viewer,
            generation,
            cancel.clone(),
        ));
        *run = Some(RunHandle { cancel, task });
        true
    }

    /// Stop polling and drop the snapshot. Does nothing if not running.
    ///
    /// Returns whether a run was stopped. Nothing is recorded in the log
    /// after this returns, so it must not be called from a log or toast
    /// subscriber.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.inner.run.lock().unwrap().take() else {
            return false;
        };

        {
            let mut status = self.inner.status.lock().unwrap();
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *status = EngineStatus {
                last_poll_at: status.last_poll_at,
                ..EngineStatus::idle(generation)
            };
        }
        drop(self.inner.emitting.lock().unwrap());
        handle.cancel.cancel();
        info!("Stopped notification polling");
        true
    }

    pub fn is_running(&self) -> bool {
        self.inner.run.lock().unwrap().is_some()
    }

    pub fn state(&self) -> EngineState {
        self.inner.status.lock().unwrap().state
    }

    pub fn status(&self) -> EngineStatus {
        self.inner.status.lock().unwrap().clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

impl Drop for PollingEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.run.lock().unwrap().take() {
            handle.cancel.cancel();
        }
    }
}

async fn run_loop(
    inner: Arc<EngineInner>,
    viewer: Viewer,
    generation: u64,
    cancel: CancellationToken,
) {
    let mut poller = Poller::new(
        inner.source.clone(),
        viewer,
        inner.settings.query.clone(),
        inner.settings.diff,
    );
    let mut breaker = CircuitBreaker::new(inner.settings.breaker.clone());

    loop {
        let Some(delay) = inner
            .run_cycle(&mut poller, &mut breaker, generation, &cancel)
            .await
        else {
            break;
        };

        debug!("Next ticket poll in {:?}", delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => break,
        }
    }

    debug!("Poll loop for generation {} finished", generation);
}

impl EngineInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Point the log at `viewer`'s store unless it already holds theirs.
    fn switch_log_owner(&self, viewer: &Viewer) {
        let Some(viewer_stores) = &self.viewer_stores else {
            return;
        };
        let mut owner = self.log_owner.lock().unwrap();
        if owner.as_deref() == Some(viewer.id.as_str()) {
            return;
        }

        let store = match viewer_stores(viewer) {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    "Failed to open notification store for {}, keeping notifications in memory: {:#}",
                    viewer.id, e
                );
                Arc::new(InMemoryNotificationStore::new())
            }
        };
        self.log.switch_store(store);
        info!("Notification log now holds notifications of {}", viewer.id);
        *owner = Some(viewer.id.clone());
    }

    /// Run one cycle. Returns the delay before the next one, or `None` when
    /// the run was stopped.
    async fn run_cycle(
        &self,
        poller: &mut Poller,
        breaker: &mut CircuitBreaker,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Option<Duration> {
        if !breaker.allow_request() {
            let wait = breaker
                .remaining_cooldown(tokio::time::Instant::now())
                .unwrap_or(self.settings.interval);
            debug!("Circuit breaker open, skipping ticket poll");
            return Some(wait);
        }

        let result = tokio::select! {
            result = poller.fetch() => result,
            _ = cancel.cancelled() => return None,
        };

        self.complete_cycle(poller, breaker, generation, result)
    }

    /// Apply a fetch result to the poller. Results for an outdated
    /// generation are discarded.
    fn complete_cycle(
        &self,
        poller: &mut Poller,
        breaker: &mut CircuitBreaker,
        generation: u64,
        result: Result<Vec<Ticket>, FetchError>,
    ) -> Option<Duration> {
        if !self.is_current(generation) {
            debug!("Discarding ticket poll result of stale generation {}", generation);
            return None;
        }

        match result {
            Ok(tickets) => {
                breaker.record_success();
                let drafts = if poller.is_baselined() {
                    poller.apply(&tickets)
                } else {
                    poller.apply_baseline(&tickets);
                    info!("Baseline taken with {} tickets", tickets.len());
                    Vec::new()
                };

                let tracked = poller.tracked();
                let current = self.update_status(generation, |status| {
                    status.state = EngineState::Polling;
                    status.consecutive_failures = 0;
                    status.breaker = BreakerState::Closed;
                    status.tracked_tickets = tracked;
                    status.last_poll_at = Some(Utc::now());
                    status.last_error = None;
                });
                if !current {
                    return None;
                }

                if !drafts.is_empty() {
                    debug!("Ticket poll produced {} notifications", drafts.len());
                }
                if !self.emit_all(generation, drafts) {
                    return None;
                }
                Some(self.settings.interval)
            }
            Err(e) => {
                warn!("Ticket poll failed ({}): {}", e.kind(), e);
                breaker.record_failure();
                let failures = breaker.consecutive_failures();
                let breaker_state = breaker.state();
                let current = self.update_status(generation, |status| {
                    status.consecutive_failures = failures;
                    status.breaker = breaker_state;
                    status.last_error = Some(e.to_string());
                });
                if !current {
                    return None;
                }
                Some(
                    self.settings
                        .retry
                        .next_delay(self.settings.interval, failures),
                )
            }
        }
    }

    /// Update the status if `generation` is still current.
    fn update_status<F: FnOnce(&mut EngineStatus)>(&self, generation: u64, f: F) -> bool {
        let mut status = self.status.lock().unwrap();
        if !self.is_current(generation) {
            return false;
        }
        f(&mut status);
        true
    }

    /// Record `drafts` for as long as `generation` stays current. Returns
    /// false if the run was stopped part way.
    fn emit_all(&self, generation: u64, drafts: Vec<NotificationDraft>) -> bool {
        for draft in drafts {
            let _emitting = self.emitting.lock().unwrap();
            if !self.is_current(generation) {
                debug!("Dropping notifications of stopped generation {}", generation);
                return false;
            }
            self.emit(draft);
        }
        true
    }

    fn emit(&self, draft: NotificationDraft) {
        if let Some(notification) = self.log.record(draft) {
            self.toasts.show(
                ToastKind::from(notification.notification_type),
                notification.title,
                Some(notification.message),
                None,
            );
        }
    }
}
