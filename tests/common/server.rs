//! Test server lifecycle management
//!
//! Each test gets its own fake backend, its own SQLite notification database
//! and a local API served on a random port. The polling engine is created
//! idle; tests start it through the API or directly.

use super::backend::FakeBackend;
use super::constants::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use support_notifier::notifications::{
    InMemoryNotificationStore, LogSettings, NotificationLog, NotificationStore,
    SqliteNotificationStore, ToastChannel,
};
use support_notifier::polling::{
    BreakerSettings, PollingEngine, PollingSettings, RetryPolicy, ViewerStores,
};
use support_notifier::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use support_notifier::tickets::TicketApiClient;
use support_notifier::user::Viewer;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Polling settings for tests: fast interval, no backoff, no breaker.
pub fn fast_polling_settings() -> PollingSettings {
    PollingSettings {
        interval: Duration::from_millis(POLL_INTERVAL_MS),
        retry: RetryPolicy::disabled(),
        breaker: BreakerSettings {
            failure_threshold: 0,
            cooldown: Duration::from_secs(60),
        },
        ..Default::default()
    }
}

/// Test server instance wired to a fake backend
///
/// When dropped, the local API and the backend shut down, the engine stops
/// and the temp database is removed.
pub struct TestServer {
    /// Base URL of the local API (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The fake ticketing backend the engine polls
    pub backend: FakeBackend,

    /// Engine shared with the local API
    pub engine: Arc<PollingEngine>,

    /// Path of the SQLite notification database
    pub db_path: PathBuf,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with `fast_polling_settings` and default log settings.
    pub async fn spawn() -> Self {
        Self::spawn_with(fast_polling_settings(), LogSettings::default()).await
    }

    /// Spawns a server with custom engine and log settings.
    ///
    /// # Panics
    ///
    /// Panics if the database, the backend or the listener cannot be set up,
    /// or if the API doesn't become ready within the timeout.
    pub async fn spawn_with(polling: PollingSettings, log_settings: LogSettings) -> Self {
        let backend = FakeBackend::spawn().await;

        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_db_dir.path().join("notifications.db");
        // Each viewer's notifications live under their own key once the engine starts.
        let log = Arc::new(NotificationLog::new(
            Arc::new(InMemoryNotificationStore::new()),
            log_settings,
        ));
        let stores_path = db_path.clone();
        let viewer_stores: ViewerStores = Arc::new(
            move |viewer: &Viewer| -> anyhow::Result<Arc<dyn NotificationStore>> {
                Ok(Arc::new(SqliteNotificationStore::for_viewer(
                    &stores_path,
                    &viewer.id,
                )?))
            },
        );

        let source = Arc::new(
            TicketApiClient::new(backend.base_url.clone(), REQUEST_TIMEOUT_SECS, None)
                .expect("Failed to build ticket client"),
        );
        // Sticky toasts keep assertions independent of expiry timing.
        let toasts = ToastChannel::new(Duration::ZERO);
        let engine = Arc::new(PollingEngine::with_viewer_stores(
            source,
            log,
            toasts,
            polling,
            viewer_stores,
        ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
        };
        let app = make_app(ServerState::new(config, engine.clone()));

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            backend,
            engine,
            db_path,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    pub fn log(&self) -> &Arc<NotificationLog> {
        self.engine.log()
    }

    pub fn toasts(&self) -> &ToastChannel {
        self.engine.toasts()
    }

    /// Waits until the engine has taken its baseline.
    pub async fn wait_for_baseline(&self) {
        let engine = self.engine.clone();
        wait_until("engine baseline", move || {
            engine.status().last_poll_at.is_some()
        })
        .await;
    }

    /// Waits until the engine has completed `cycles` more successful polls.
    pub async fn wait_for_polls(&self, cycles: usize) {
        let queries_before = self.backend.list_queries().len();
        wait_until("further polls", || {
            self.backend.list_queries().len() >= queries_before + cycles
        })
        .await;
        // The request is counted when served, give the engine time to apply it.
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS / 2)).await;
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.engine.stop();
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Polls `condition` until it holds.
///
/// # Panics
///
/// Panics with `what` if the condition is still false after `WAIT_TIMEOUT_MS`.
pub async fn wait_until<F: FnMut() -> bool>(what: &str, mut condition: F) {
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(WAIT_TIMEOUT_MS);
    while !condition() {
        if start.elapsed() > timeout {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(WAIT_POLL_INTERVAL_MS)).await;
    }
}
