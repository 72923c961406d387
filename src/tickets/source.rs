//! Abstraction over the ticket store.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Ticket, TicketPatch, TicketQuery};
use crate::user::{User, Viewer};

/// Errors returned when talking to the ticket store.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short machine-friendly name, used in logs and status reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Connection(_) => "connection",
            FetchError::Timeout(_) => "timeout",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

/// Read/write access to tickets and users.
///
/// The polling engine only ever calls [`TicketSource::get_tickets`] and
/// [`TicketSource::get_ticket`]; the remaining operations complete the
/// consumed contract of the backend.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Fetch the tickets visible to `viewer`, optionally filtered.
    async fn get_tickets(
        &self,
        query: &TicketQuery,
        viewer: Option<&Viewer>,
    ) -> Result<Vec<Ticket>, FetchError>;

    /// Fetch a single ticket with its full message thread.
    async fn get_ticket(&self, id: &str) -> Result<Ticket, FetchError>;

    /// Apply a partial update on behalf of `actor_id` / `actor_name`.
    async fn update_ticket(
        &self,
        id: &str,
        patch: &TicketPatch,
        actor_id: &str,
        actor_name: &str,
    ) -> Result<Ticket, FetchError>;

    async fn create_ticket(&self, patch: &TicketPatch) -> Result<Ticket, FetchError>;

    async fn get_users(&self) -> Result<Vec<User>, FetchError>;
}
