//! Live refresh of a single ticket's message thread.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tickets::{TicketMessage, TicketSource};

pub const DEFAULT_DETAIL_INTERVAL: Duration = Duration::from_millis(2000);

/// Polls one ticket and publishes its messages whenever their count changes.
///
/// Produces no notifications. Stops on [`MessageWatcher::stop`] or when dropped.
pub struct MessageWatcher {
    ticket_id: String,
    receiver: watch::Receiver<Vec<TicketMessage>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MessageWatcher {
    /// Start watching `ticket_id`. Must be called from within a tokio runtime.
    pub fn spawn(
        source: Arc<dyn TicketSource>,
        ticket_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let ticket_id = ticket_id.into();
        let (sender, receiver) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_loop(
            source,
            ticket_id.clone(),
            interval,
            sender,
            cancel.clone(),
        ));
        debug!("Watching messages of ticket {}", ticket_id);
        Self {
            ticket_id,
            receiver,
            cancel,
            task,
        }
    }

    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    /// Receiver that is marked changed on every published update.
    pub fn subscribe(&self) -> watch::Receiver<Vec<TicketMessage>> {
        self.receiver.clone()
    }

    pub fn messages(&self) -> Vec<TicketMessage> {
        self.receiver.borrow().clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.task.is_finished()
    }
}

impl Drop for MessageWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn watch_loop(
    source: Arc<dyn TicketSource>,
    ticket_id: String,
    interval: Duration,
    sender: watch::Sender<Vec<TicketMessage>>,
    cancel: CancellationToken,
) {
    let mut last_count: Option<usize> = None;

    loop {
        let result = tokio::select! {
            result = source.get_ticket(&ticket_id) => result,
            _ = cancel.cancelled() => break,
        };

        match result {
            Ok(ticket) => {
                let count = ticket.message_count();
                if last_count != Some(count) {
                    debug!("Ticket {} now has {} messages", ticket_id, count);
                    last_count = Some(count);
                    sender.send_replace(ticket.messages);
                }
            }
            Err(e) => warn!("Failed to refresh ticket {} ({}): {}", ticket_id, e.kind(), e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => break,
        }
    }

    debug!("Stopped watching messages of ticket {}", ticket_id);
}
