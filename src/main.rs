use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use support_notifier::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_DETAIL_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SEC,
};
use support_notifier::notifications::{
    InMemoryNotificationStore, NotificationLog, NotificationStore, SqliteNotificationStore,
    ToastChannel,
};
use support_notifier::polling::{MessageWatcher, PollingEngine, ViewerStores};
use support_notifier::server::{run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use support_notifier::tickets::{TicketApiClient, TicketSource};
use support_notifier::user::Viewer;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the ticketing REST API, e.g. http://localhost:5000/api
    #[clap(long)]
    pub api_base_url: Option<String>,

    /// Bearer token sent to the ticketing API.
    #[clap(long)]
    pub api_token: Option<String>,

    /// Timeout in seconds for ticketing API requests.
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SEC)]
    pub request_timeout_sec: u64,

    /// Id of the viewer to poll for at startup.
    #[clap(long)]
    pub viewer_id: Option<String>,

    /// Role of the viewer: administrator, support-agent or customer.
    #[clap(long)]
    pub viewer_role: Option<String>,

    /// Interval between ticket list polls, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Interval between message refreshes of the watched ticket, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_DETAIL_POLL_INTERVAL_MS)]
    pub detail_poll_interval_ms: u64,

    /// Ticket id whose message thread is refreshed live.
    #[clap(long)]
    pub watch_ticket: Option<String>,

    /// Path to the SQLite database holding the notification log.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// The port the local API listens on.
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Also notify staff when a ticket gets assigned to them.
    #[clap(long)]
    pub notify_assignments: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            api_base_url: self.api_base_url.clone(),
            api_token: self.api_token.clone(),
            request_timeout_sec: self.request_timeout_sec,
            viewer_id: self.viewer_id.clone(),
            viewer_role: self.viewer_role.clone(),
            poll_interval_ms: self.poll_interval_ms,
            detail_poll_interval_ms: self.detail_poll_interval_ms,
            watch_ticket: self.watch_ticket.clone(),
            db_path: self.db_path.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            notify_assignments: self.notify_assignments,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening notification store at {:?}...", config.db_path);
    let store: Arc<dyn NotificationStore> = match &config.viewer {
        Some(viewer) => Arc::new(SqliteNotificationStore::for_viewer(
            &config.db_path,
            &viewer.id,
        )?),
        None => Arc::new(InMemoryNotificationStore::new()),
    };
    let log = Arc::new(NotificationLog::new(store, config.log_settings()));
    info!(
        "Restored {} notifications ({} unread)",
        log.len(),
        log.unread_count()
    );
    let _log_subscription = log.subscribe(|notifications| {
        let unread = notifications.iter().filter(|n| !n.read).count();
        debug!(
            "Notification log changed: {} entries, {} unread",
            notifications.len(),
            unread
        );
    });

    info!("Ticketing API at {}", config.api_base_url);
    let source: Arc<dyn TicketSource> = Arc::new(TicketApiClient::new(
        config.api_base_url.clone(),
        config.request_timeout_sec,
        config.api_token.clone(),
    )?);

    let toasts = ToastChannel::new(config.toast_duration());
    let db_path = config.db_path.clone();
    let viewer_stores: ViewerStores = Arc::new(
        move |viewer: &Viewer| -> Result<Arc<dyn NotificationStore>> {
            Ok(Arc::new(SqliteNotificationStore::for_viewer(&db_path, &viewer.id)?))
        },
    );
    let engine = Arc::new(PollingEngine::with_viewer_stores(
        source.clone(),
        log,
        toasts,
        config.polling_settings(),
        viewer_stores,
    ));

    match &config.viewer {
        Some(viewer) => {
            engine.start(viewer.clone());
        }
        None => info!("No viewer configured, waiting for POST /v1/engine/start"),
    }

    let watcher = config.watch_ticket.as_ref().map(|ticket_id| {
        let watcher = MessageWatcher::spawn(source.clone(), ticket_id, config.detail_poll_interval);
        let mut updates = watcher.subscribe();
        let ticket_id = watcher.ticket_id().to_string();
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let count = updates.borrow_and_update().len();
                info!("Ticket {} thread now has {} messages", ticket_id, count);
            }
        });
        watcher
    });

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal");
        signal_token.cancel();
    });

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
    };
    let state = ServerState::new(server_config, engine.clone());
    let result = run_server(state, shutdown).await;

    if let Some(watcher) = watcher {
        watcher.stop();
    }
    engine.stop();
    info!("Shut down");
    result
}
