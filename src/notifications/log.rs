//! The durable, de-duplicated notification log.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use super::models::{Notification, NotificationDraft};
use super::store::NotificationStore;
use crate::subscribers::{SubscriberList, Subscription};

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Maximum number of retained notifications.
    pub capacity: usize,
    /// Candidates with the same type and ticket within this window are dropped.
    pub dedup_window: Duration,
    /// Merge with what is already stored before saving, instead of overwriting.
    pub merge_on_persist: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            capacity: 50,
            dedup_window: Duration::from_millis(5000),
            merge_on_persist: true,
        }
    }
}

/// Notification log shared by the polling engine and the UI.
///
/// Entries are kept most recent first. Every mutation is persisted right
/// away and then delivered to all subscribers with the full list.
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
    store: Mutex<Arc<dyn NotificationStore>>,
    subscribers: SubscriberList<Notification>,
    settings: LogSettings,
}

impl NotificationLog {
    /// Create a log, restoring previously stored entries.
    ///
    /// A store that cannot be read is logged and treated as empty.
    pub fn new(store: Arc<dyn NotificationStore>, settings: LogSettings) -> Self {
        let entries = load_entries(store.as_ref(), settings.capacity);
        Self {
            entries: Mutex::new(entries),
            store: Mutex::new(store),
            subscribers: SubscriberList::new(),
            settings,
        }
    }

    /// Move the log onto another store, replacing the entries with the ones
    /// stored there. Subscribers receive the new list.
    pub fn switch_store(&self, store: Arc<dyn NotificationStore>) {
        let snapshot = {
            let mut entries = self.entries.lock().unwrap();
            *entries = load_entries(store.as_ref(), self.settings.capacity);
            *self.store.lock().unwrap() = store;
            entries.clone()
        };
        debug!("Notification log switched store, {} entries", snapshot.len());
        self.subscribers.notify(&snapshot);
    }

    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    /// Record a candidate notification stamped with the current time.
    ///
    /// Returns the accepted notification, or `None` if it was a duplicate.
    pub fn record(&self, draft: NotificationDraft) -> Option<Notification> {
        self.record_at(draft, Utc::now())
    }

    /// Record a candidate notification with an explicit timestamp.
    pub fn record_at(&self, draft: NotificationDraft, now: DateTime<Utc>) -> Option<Notification> {
        let (accepted, snapshot) = {
            let mut entries = self.entries.lock().unwrap();
            if self.is_duplicate(&entries, &draft, now) {
                debug!(
                    "Dropping duplicate {} notification for ticket {}",
                    draft.notification_type.as_str(),
                    draft.ticket_id
                );
                return None;
            }

            let notification = draft.into_notification(now);
            entries.insert(0, notification.clone());
            entries.truncate(self.settings.capacity);
            self.persist(&mut entries);
            (notification, entries.clone())
        };

        self.subscribers.notify(&snapshot);
        Some(accepted)
    }

    fn is_duplicate(
        &self,
        entries: &[Notification],
        draft: &NotificationDraft,
        now: DateTime<Utc>,
    ) -> bool {
        let window_ms = self.settings.dedup_window.as_millis() as i64;
        entries.iter().any(|existing| {
            existing.notification_type == draft.notification_type
                && existing.ticket_id == draft.ticket_id
                && (now - existing.timestamp).num_milliseconds().abs() < window_ms
        })
    }

    /// Mark one notification as read. Returns false if no entry has `id`.
    pub fn mark_as_read(&self, id: &str) -> bool {
        self.update(|entries| match entries.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        })
    }

    pub fn mark_all_as_read(&self) {
        self.update(|entries| {
            entries.iter_mut().for_each(|n| n.read = true);
            true
        });
    }

    /// Marks every entry as read. Entries are kept, not deleted.
    pub fn clear_all(&self) {
        self.mark_all_as_read();
    }

    pub fn unread_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a listener. It is invoked immediately with the current list
    /// and again after every change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let subscription = self.subscribers.add(callback.clone());
        callback(&self.notifications());
        subscription
    }

    /// Apply `mutate`; if it reports a change, persist and notify.
    fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut Vec<Notification>) -> bool,
    {
        let snapshot = {
            let mut entries = self.entries.lock().unwrap();
            if !mutate(&mut entries) {
                return false;
            }
            self.persist(&mut entries);
            entries.clone()
        };
        self.subscribers.notify(&snapshot);
        true
    }

    /// Save `entries`, merging with the stored copy first when configured.
    /// Storage failures are logged; the in-memory list stays authoritative.
    fn persist(&self, entries: &mut Vec<Notification>) {
        let store = self.store.lock().unwrap().clone();
        if self.settings.merge_on_persist {
            match store.load() {
                Ok(stored) => {
                    *entries = merge_notifications(entries, &stored, self.settings.capacity);
                }
                Err(e) => warn!("Failed to load stored notifications for merge: {}", e),
            }
        }

        if let Err(e) = store.save(entries) {
            warn!("Failed to persist notifications: {}", e);
        }
    }
}

fn load_entries(store: &dyn NotificationStore, capacity: usize) -> Vec<Notification> {
    let mut entries = match store.load() {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to load stored notifications, starting empty: {}", e);
            Vec::new()
        }
    };
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(capacity);
    entries
}

/// Merge two notification lists by id.
///
/// Read flags are OR-ed, entries only present in `remote` are adopted, the
/// result is ordered most recent first and capped at `capacity`.
pub fn merge_notifications(
    local: &[Notification],
    remote: &[Notification],
    capacity: usize,
) -> Vec<Notification> {
    let mut merged = local.to_vec();
    for remote_entry in remote {
        match merged.iter_mut().find(|n| n.id == remote_entry.id) {
            Some(existing) => existing.read |= remote_entry.read,
            None => merged.push(remote_entry.clone()),
        }
    }
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged.truncate(capacity);
    merged
}
