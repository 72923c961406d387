use anyhow::{Context, Result};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{log_requests, state::*};
use crate::notifications::ToastChannel;
use crate::polling::EngineStatus;
use crate::user::{Viewer, ViewerRole};

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UnreadCount {
    pub count: usize,
}

#[derive(Deserialize, Debug)]
struct StartEngineBody {
    pub id: String,
    pub role: ViewerRole,
}

#[derive(Serialize)]
struct EngineTransition {
    changed: bool,
    status: EngineStatus,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    format!(
        "support-notifier\nuptime: {}\nengine: {:?}\nunread: {}\n",
        format_uptime(state.start_time.elapsed()),
        state.engine.state(),
        state.log.unread_count()
    )
}

async fn get_notifications(State(log): State<GuardedNotificationLog>) -> Response {
    Json(log.notifications()).into_response()
}

async fn get_unread_count(State(log): State<GuardedNotificationLog>) -> Response {
    Json(UnreadCount {
        count: log.unread_count(),
    })
    .into_response()
}

async fn mark_notification_read(
    State(log): State<GuardedNotificationLog>,
    Path(id): Path<String>,
) -> Response {
    if log.mark_as_read(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn mark_all_notifications_read(State(log): State<GuardedNotificationLog>) -> Response {
    log.mark_all_as_read();
    StatusCode::NO_CONTENT.into_response()
}

async fn clear_notifications(State(log): State<GuardedNotificationLog>) -> Response {
    log.clear_all();
    StatusCode::NO_CONTENT.into_response()
}

async fn get_toasts(State(toasts): State<ToastChannel>) -> Response {
    Json(toasts.toasts()).into_response()
}

async fn clear_toasts(State(toasts): State<ToastChannel>) -> Response {
    toasts.clear();
    StatusCode::NO_CONTENT.into_response()
}

async fn remove_toast(State(toasts): State<ToastChannel>, Path(id): Path<String>) -> Response {
    if toasts.remove(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn get_engine_status(State(engine): State<GuardedPollingEngine>) -> Response {
    Json(engine.status()).into_response()
}

async fn start_engine(
    State(engine): State<GuardedPollingEngine>,
    Json(body): Json<StartEngineBody>,
) -> Response {
    if body.id.is_empty() || body.role == ViewerRole::Unknown {
        return (StatusCode::BAD_REQUEST, "A viewer id and a known role are required")
            .into_response();
    }
    let changed = engine.start(Viewer::new(body.id, body.role));
    Json(EngineTransition {
        changed,
        status: engine.status(),
    })
    .into_response()
}

async fn stop_engine(State(engine): State<GuardedPollingEngine>) -> Response {
    let changed = engine.stop();
    Json(EngineTransition {
        changed,
        status: engine.status(),
    })
    .into_response()
}

pub fn make_app(state: ServerState) -> Router {
    let notification_routes: Router = Router::new()
        .route("/", get(get_notifications))
        .route("/unread-count", get(get_unread_count))
        .route("/read-all", post(mark_all_notifications_read))
        .route("/clear", post(clear_notifications))
        .route("/{id}/read", post(mark_notification_read))
        .with_state(state.clone());

    let toast_routes: Router = Router::new()
        .route("/", get(get_toasts))
        .route("/", delete(clear_toasts))
        .route("/{id}", delete(remove_toast))
        .with_state(state.clone());

    let engine_routes: Router = Router::new()
        .route("/", get(get_engine_status))
        .route("/start", post(start_engine))
        .route("/stop", post(stop_engine))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    home_router
        .nest("/v1/notifications", notification_routes)
        .nest("/v1/toasts", toast_routes)
        .nest("/v1/engine", engine_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

/// Serve the local API until `shutdown` is cancelled.
pub async fn run_server(state: ServerState, shutdown: CancellationToken) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind local API on port {}", port))?;
    info!("Local API listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Local API server failed")
}
