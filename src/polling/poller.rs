//! One viewer's ticket snapshot and the fetch/diff step applied to it.

use std::sync::Arc;

use super::diff::{diff_tickets, snapshot_of, DiffOptions, Snapshot};
use crate::notifications::NotificationDraft;
use crate::tickets::{FetchError, Ticket, TicketQuery, TicketSource};
use crate::user::Viewer;

/// Holds the snapshot for a single run of the engine.
///
/// Until a baseline has been taken the poller has no snapshot and
/// [`Poller::apply`] only records one.
pub struct Poller {
    source: Arc<dyn TicketSource>,
    viewer: Viewer,
    query: TicketQuery,
    options: DiffOptions,
    snapshot: Option<Snapshot>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn TicketSource>,
        viewer: Viewer,
        query: TicketQuery,
        options: DiffOptions,
    ) -> Self {
        Self {
            source,
            viewer,
            query,
            options,
            snapshot: None,
        }
    }

    pub fn is_baselined(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Number of tickets in the current snapshot.
    pub fn tracked(&self) -> usize {
        self.snapshot.as_ref().map(|s| s.len()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub async fn fetch(&self) -> Result<Vec<Ticket>, FetchError> {
        self.source.get_tickets(&self.query, Some(&self.viewer)).await
    }

    /// Record `tickets` as the baseline without producing notifications.
    pub fn apply_baseline(&mut self, tickets: &[Ticket]) {
        self.snapshot = Some(snapshot_of(tickets));
    }

    /// Diff `tickets` against the snapshot, then replace the snapshot.
    pub fn apply(&mut self, tickets: &[Ticket]) -> Vec<NotificationDraft> {
        let Some(prev) = self.snapshot.as_ref() else {
            self.apply_baseline(tickets);
            return Vec::new();
        };
        let drafts = diff_tickets(prev, tickets, &self.viewer, self.options);
        self.snapshot = Some(snapshot_of(tickets));
        drafts
    }
}
