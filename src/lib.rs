//! Support ticket notifier library
//!
//! Polls a ticketing backend on behalf of one viewer and turns ticket changes
//! into a de-duplicated, persisted notification log with a toast side channel.

pub mod config;
pub mod notifications;
pub mod polling;
pub mod server;
pub mod sqlite_persistence;
pub mod subscribers;
pub mod tickets;
pub mod user;

// Re-export commonly used types for convenience
pub use notifications::{
    Notification, NotificationLog, NotificationStore, SqliteNotificationStore, ToastChannel,
};
pub use polling::{PollingEngine, PollingSettings};
pub use server::{run_server, RequestsLoggingLevel};
pub use tickets::{TicketApiClient, TicketSource};
pub use user::{Viewer, ViewerRole};
