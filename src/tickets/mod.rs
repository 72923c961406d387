//! Ticket store access: models, the source trait and the HTTP client.

mod client;
#[cfg(test)]
pub(crate) mod fake;
mod models;
mod source;

pub use client::{ticket_query_params, TicketApiClient};
pub use models::{Ticket, TicketMessage, TicketPatch, TicketPriority, TicketQuery, TicketStatus};
pub use source::{FetchError, TicketSource};
