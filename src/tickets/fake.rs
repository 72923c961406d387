//! In-process ticket source for unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::models::{Ticket, TicketPatch, TicketQuery};
use super::source::{FetchError, TicketSource};
use crate::user::{User, Viewer};

#[derive(Default)]
pub struct FakeTicketSource {
    tickets: Mutex<Vec<Ticket>>,
    failing: AtomicBool,
    list_calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeTicketSource {
    pub fn new(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets: Mutex::new(tickets),
            ..Default::default()
        }
    }

    pub fn update<F: FnOnce(&mut Ticket)>(&self, id: &str, f: F) {
        let mut tickets = self.tickets.lock().unwrap();
        if let Some(ticket) = tickets.iter_mut().find(|t| t.id == id) {
            f(ticket);
        }
    }

    pub fn push(&self, ticket: Ticket) {
        self.tickets.lock().unwrap().push(ticket);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Make the next list fetch wait until the returned `Notify` fires.
    pub fn hold_next(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn check_failing(&self) -> Result<(), FetchError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(FetchError::Connection("backend unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TicketSource for FakeTicketSource {
    async fn get_tickets(
        &self,
        _query: &TicketQuery,
        _viewer: Option<&Viewer>,
    ) -> Result<Vec<Ticket>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failing()?;
        Ok(self.tickets.lock().unwrap().clone())
    }

    async fn get_ticket(&self, id: &str) -> Result<Ticket, FetchError> {
        self.check_failing()?;
        self.tickets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: format!("/tickets/{}", id),
            })
    }

    async fn update_ticket(
        &self,
        id: &str,
        patch: &TicketPatch,
        _actor_id: &str,
        _actor_name: &str,
    ) -> Result<Ticket, FetchError> {
        self.check_failing()?;
        self.update(id, |ticket| {
            if let Some(status) = patch.status {
                ticket.status = status;
            }
            if let Some(assigned_to) = &patch.assigned_to {
                ticket.assigned_to = Some(assigned_to.clone());
            }
            if let Some(messages) = &patch.messages {
                ticket.messages = messages.clone();
            }
        });
        self.get_ticket(id).await
    }

    async fn create_ticket(&self, patch: &TicketPatch) -> Result<Ticket, FetchError> {
        self.check_failing()?;
        let mut tickets = self.tickets.lock().unwrap();
        let ticket = Ticket {
            id: format!("fake-{}", tickets.len() + 1),
            title: patch.title.clone().unwrap_or_default(),
            status: patch.status.unwrap_or_default(),
            priority: patch.priority,
            category: patch.category.clone(),
            assigned_to: patch.assigned_to.clone(),
            customer_id: patch.customer_id.clone().unwrap_or_default(),
            messages: patch.messages.clone().unwrap_or_default(),
        };
        tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn get_users(&self) -> Result<Vec<User>, FetchError> {
        self.check_failing()?;
        Ok(Vec::new())
    }
}
