//! Fake ticketing backend
//!
//! A small axum app serving the ticket/user REST routes from memory, so the
//! real `TicketApiClient` can be exercised end to end. Tests mutate the data
//! directly and the next poll picks the changes up.

use super::constants::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use support_notifier::tickets::{Ticket, TicketMessage, TicketStatus};
use support_notifier::user::{User, ViewerRole};
use tokio::net::TcpListener;

#[derive(Default)]
struct BackendData {
    tickets: Vec<Ticket>,
    // Served after `tickets` by `GET /tickets`, as-is.
    raw_tickets: Vec<serde_json::Value>,
    users: Vec<User>,
    failing: bool,
    list_queries: Vec<HashMap<String, String>>,
    next_id: u64,
}

type SharedData = Arc<Mutex<BackendData>>;

/// In-memory ticketing backend listening on a random local port.
///
/// Shuts down when dropped.
pub struct FakeBackend {
    /// Base URL to hand to `TicketApiClient` (e.g., "http://127.0.0.1:12345/api")
    pub base_url: String,
    data: SharedData,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

pub fn ticket(id: &str, customer: &str, status: TicketStatus) -> Ticket {
    Ticket {
        id: id.to_string(),
        title: format!("Ticket {}", id),
        status,
        priority: None,
        category: None,
        assigned_to: None,
        customer_id: customer.to_string(),
        messages: Vec::new(),
    }
}

pub fn message(author: &str, text: &str) -> TicketMessage {
    TicketMessage {
        user_id: author.to_string(),
        user_name: None,
        message: text.to_string(),
        timestamp: None,
        is_internal: false,
    }
}

fn seed_tickets() -> Vec<Ticket> {
    let mut second = ticket(TICKET_2_ID, OTHER_CUSTOMER_ID, TicketStatus::InProgress);
    second.assigned_to = Some(OTHER_AGENT_ID.to_string());
    vec![
        ticket(TICKET_1_ID, CUSTOMER_ID, TicketStatus::Open),
        second,
    ]
}

fn seed_users() -> Vec<User> {
    let user = |id: &str, name: &str, role| User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", id),
        role,
        avatar: None,
    };
    vec![
        user(ADMIN_ID, "Ada Admin", ViewerRole::Administrator),
        user(AGENT_ID, "Sam Agent", ViewerRole::SupportAgent),
        user(OTHER_AGENT_ID, "Kim Agent", ViewerRole::SupportAgent),
        user(CUSTOMER_ID, "Chris Customer", ViewerRole::Customer),
        user(OTHER_CUSTOMER_ID, "Dana Customer", ViewerRole::Customer),
    ]
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable").into_response()
}

async fn list_tickets(
    State(data): State<SharedData>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut data = data.lock().unwrap();
    data.list_queries.push(query);
    if data.failing {
        return unavailable();
    }
    let mut body: Vec<serde_json::Value> = data
        .tickets
        .iter()
        .map(|t| serde_json::to_value(t).unwrap())
        .collect();
    body.extend(data.raw_tickets.iter().cloned());
    Json(body).into_response()
}

async fn get_ticket(State(data): State<SharedData>, Path(id): Path<String>) -> Response {
    let data = data.lock().unwrap();
    if data.failing {
        return unavailable();
    }
    match data.tickets.iter().find(|t| t.id == id) {
        Some(ticket) => Json(ticket.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// Applies the JSON body on top of the stored ticket, ignoring the actor fields.
async fn update_ticket(
    State(data): State<SharedData>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let mut data = data.lock().unwrap();
    let Some(ticket) = data.tickets.iter_mut().find(|t| t.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut merged = serde_json::to_value(&*ticket).unwrap();
    if let (Some(target), Some(patch)) = (merged.as_object_mut(), body.as_object()) {
        for (key, value) in patch {
            if key != "userId" && key != "userName" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    match serde_json::from_value::<Ticket>(merged) {
        Ok(updated) => {
            *ticket = updated.clone();
            Json(updated).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn create_ticket(
    State(data): State<SharedData>,
    Json(mut body): Json<serde_json::Value>,
) -> Response {
    let mut data = data.lock().unwrap();
    data.next_id += 1;
    let id = format!("N-{}", data.next_id);
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), serde_json::Value::String(id));
    }
    match serde_json::from_value::<Ticket>(body) {
        Ok(ticket) => {
            data.tickets.push(ticket.clone());
            (StatusCode::CREATED, Json(ticket)).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn list_users(State(data): State<SharedData>) -> Response {
    let data = data.lock().unwrap();
    if data.failing {
        return unavailable();
    }
    Json(data.users.clone()).into_response()
}

impl FakeBackend {
    /// Spawns the backend seeded with two tickets and five users.
    pub async fn spawn() -> Self {
        let data: SharedData = Arc::new(Mutex::new(BackendData {
            tickets: seed_tickets(),
            users: seed_users(),
            ..Default::default()
        }));

        let api = Router::new()
            .route("/tickets", get(list_tickets).post(create_ticket))
            .route("/tickets/{id}", get(get_ticket).put(update_ticket))
            .route("/users", get(list_users))
            .with_state(data.clone());
        let app = Router::new().nest("/api", api);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake backend failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/api", port),
            data,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.data.lock().unwrap().tickets.clone()
    }

    pub fn push_ticket(&self, ticket: Ticket) {
        self.data.lock().unwrap().tickets.push(ticket);
    }

    /// Adds an arbitrary JSON entry to the ticket list, e.g. a malformed one.
    pub fn push_raw_ticket(&self, value: serde_json::Value) {
        self.data.lock().unwrap().raw_tickets.push(value);
    }

    pub fn update_ticket<F: FnOnce(&mut Ticket)>(&self, id: &str, f: F) {
        let mut data = self.data.lock().unwrap();
        let ticket = data
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .expect("No such ticket in fake backend");
        f(ticket);
    }

    /// Makes every read route answer 503 until turned off again.
    pub fn set_failing(&self, failing: bool) {
        self.data.lock().unwrap().failing = failing;
    }

    /// Query strings received by `GET /tickets`, failed ones included, oldest first.
    pub fn list_queries(&self) -> Vec<HashMap<String, String>> {
        self.data.lock().unwrap().list_queries.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
