//! Snapshot diffing between two poll cycles.

use std::collections::HashMap;

use crate::notifications::{NotificationDraft, NotificationPriority, NotificationType};
use crate::tickets::{Ticket, TicketStatus};
use crate::user::Viewer;

/// What the engine remembers about a ticket between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketState {
    pub status: TicketStatus,
    pub message_count: usize,
    pub assigned_to: Option<String>,
}

impl From<&Ticket> for TicketState {
    fn from(ticket: &Ticket) -> Self {
        Self {
            status: ticket.status,
            message_count: ticket.message_count(),
            assigned_to: ticket.assigned_to.clone(),
        }
    }
}

/// Ticket states keyed by ticket id.
pub type Snapshot = HashMap<String, TicketState>;

/// Build the snapshot for a full fetched list, visible or not.
pub fn snapshot_of(tickets: &[Ticket]) -> Snapshot {
    tickets
        .iter()
        .map(|ticket| (ticket.id.clone(), TicketState::from(ticket)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Also report tickets newly assigned to a staff viewer.
    pub notify_assignments: bool,
}

/// Compare `tickets` against the previous snapshot and return the
/// notifications `viewer` should receive, in fetch order.
pub fn diff_tickets(
    prev: &Snapshot,
    tickets: &[Ticket],
    viewer: &Viewer,
    options: DiffOptions,
) -> Vec<NotificationDraft> {
    let mut drafts = Vec::new();

    for ticket in tickets {
        if !viewer.can_see(ticket) {
            continue;
        }

        let Some(previous) = prev.get(&ticket.id) else {
            drafts.push(new_ticket(ticket));
            continue;
        };

        if ticket.status != previous.status {
            drafts.push(status_change(ticket, previous.status));
        }

        if ticket.message_count() > previous.message_count {
            let delta = ticket.message_count() - previous.message_count;
            let authored_by_viewer = ticket
                .last_message()
                .map(|m| m.user_id == viewer.id)
                .unwrap_or(false);
            if !authored_by_viewer {
                drafts.push(new_message(ticket, delta));
            }
        }

        if options.notify_assignments
            && viewer.role.is_staff()
            && ticket.assigned_to.as_deref() == Some(viewer.id.as_str())
            && previous.assigned_to != ticket.assigned_to
        {
            drafts.push(assignment(ticket));
        }
    }

    drafts
}

fn new_ticket(ticket: &Ticket) -> NotificationDraft {
    let message = if ticket.title.is_empty() {
        format!("#{} was created", ticket.id)
    } else {
        format!("#{}: {}", ticket.id, ticket.title)
    };
    NotificationDraft {
        notification_type: NotificationType::NewTicket,
        title: "New ticket".to_string(),
        message,
        ticket_id: ticket.id.clone(),
        priority: ticket.priority.map(NotificationPriority::from),
    }
}

fn status_change(ticket: &Ticket, old: TicketStatus) -> NotificationDraft {
    NotificationDraft {
        notification_type: NotificationType::StatusChange,
        title: "Ticket status updated".to_string(),
        message: format!("#{}: {} → {}", ticket.id, old, ticket.status),
        ticket_id: ticket.id.clone(),
        priority: None,
    }
}

fn new_message(ticket: &Ticket, delta: usize) -> NotificationDraft {
    let noun = if delta == 1 { "message" } else { "messages" };
    NotificationDraft {
        notification_type: NotificationType::NewMessage,
        title: "New message".to_string(),
        message: format!("{} new {} in #{}", delta, noun, ticket.id),
        ticket_id: ticket.id.clone(),
        priority: None,
    }
}

fn assignment(ticket: &Ticket) -> NotificationDraft {
    NotificationDraft {
        notification_type: NotificationType::Assignment,
        title: "Ticket assigned".to_string(),
        message: format!("#{} was assigned to you", ticket.id),
        ticket_id: ticket.id.clone(),
        priority: None,
    }
}
