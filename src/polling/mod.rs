//! Ticket polling: snapshot diffing, the poll loop and its failure handling.

mod circuit_breaker;
mod diff;
mod engine;
mod message_watcher;
mod poller;
mod retry_policy;

pub use circuit_breaker::{BreakerSettings, BreakerState, CircuitBreaker};
pub use diff::{diff_tickets, snapshot_of, DiffOptions, Snapshot, TicketState};
pub use engine::{
    EngineState, EngineStatus, PollingEngine, PollingSettings, ViewerStores,
    DEFAULT_POLL_INTERVAL,
};
pub use message_watcher::{MessageWatcher, DEFAULT_DETAIL_INTERVAL};
pub use poller::Poller;
pub use retry_policy::RetryPolicy;
