//! Notification storage trait

use anyhow::Result;
use std::sync::Mutex;

use super::models::Notification;

/// Durable storage for the notification log.
///
/// The log is stored as a whole: `save` replaces whatever was stored before.
pub trait NotificationStore: Send + Sync {
    /// Load the stored notifications, most recent first.
    /// Returns an empty list if nothing was stored yet.
    fn load(&self) -> Result<Vec<Notification>>;

    /// Replace the stored notifications.
    fn save(&self, notifications: &[Notification]) -> Result<()>;
}

/// Process-local store, used in tests and when no database is configured.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifications(notifications: Vec<Notification>) -> Self {
        Self {
            notifications: Mutex::new(notifications),
        }
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn load(&self) -> Result<Vec<Notification>> {
        Ok(self.notifications.lock().unwrap().clone())
    }

    fn save(&self, notifications: &[Notification]) -> Result<()> {
        *self.notifications.lock().unwrap() = notifications.to_vec();
        Ok(())
    }
}
