//! Notification data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tickets::TicketPriority;

/// Notification type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    NewTicket,
    StatusChange,
    NewMessage,
    TicketUpdate,
    Assignment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewTicket => "new-ticket",
            NotificationType::StatusChange => "status-change",
            NotificationType::NewMessage => "new-message",
            NotificationType::TicketUpdate => "ticket-update",
            NotificationType::Assignment => "assignment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

impl From<TicketPriority> for NotificationPriority {
    fn from(priority: TicketPriority) -> Self {
        match priority {
            TicketPriority::Low => NotificationPriority::Low,
            TicketPriority::Medium => NotificationPriority::Medium,
            TicketPriority::High | TicketPriority::Urgent => NotificationPriority::High,
        }
    }
}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub ticket_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<NotificationPriority>,
}

/// A candidate notification produced by the diff, before it is accepted
/// into the log and given an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub ticket_id: String,
    pub priority: Option<NotificationPriority>,
}

impl NotificationDraft {
    pub fn into_notification(self, timestamp: DateTime<Utc>) -> Notification {
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            ticket_id: self.ticket_id,
            timestamp,
            read: false,
            priority: self.priority,
        }
    }
}
