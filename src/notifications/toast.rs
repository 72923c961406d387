//! Ephemeral toast messages.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::debug;

use super::models::NotificationType;
use crate::subscribers::{SubscriberList, Subscription};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl From<NotificationType> for ToastKind {
    fn from(notification_type: NotificationType) -> Self {
        match notification_type {
            NotificationType::StatusChange => ToastKind::Success,
            NotificationType::NewTicket | NotificationType::NewMessage => ToastKind::Info,
            _ => ToastKind::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ToastKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Display time in milliseconds. Zero keeps the toast until removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

struct ToastInner {
    toasts: Mutex<Vec<Toast>>,
    subscribers: SubscriberList<Toast>,
    next_id: AtomicU64,
    default_duration: Duration,
}

impl ToastInner {
    fn remove(&self, id: &str) -> bool {
        let snapshot = {
            let mut toasts = self.toasts.lock().unwrap();
            let before = toasts.len();
            toasts.retain(|t| t.id != id);
            if toasts.len() == before {
                return false;
            }
            toasts.clone()
        };
        self.subscribers.notify(&snapshot);
        true
    }
}

/// Observer list of short-lived messages shown next to the notification log.
///
/// Toasts expire on their own when a tokio runtime is available; outside a
/// runtime they stay until [`ToastChannel::remove`] or [`ToastChannel::clear`].
#[derive(Clone)]
pub struct ToastChannel {
    inner: Arc<ToastInner>,
}

impl ToastChannel {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            inner: Arc::new(ToastInner {
                toasts: Mutex::new(Vec::new()),
                subscribers: SubscriberList::new(),
                next_id: AtomicU64::new(1),
                default_duration,
            }),
        }
    }

    pub fn success(
        &self,
        title: impl Into<String>,
        message: Option<String>,
        duration: Option<Duration>,
    ) -> String {
        self.show(ToastKind::Success, title, message, duration)
    }

    pub fn error(
        &self,
        title: impl Into<String>,
        message: Option<String>,
        duration: Option<Duration>,
    ) -> String {
        self.show(ToastKind::Error, title, message, duration)
    }

    pub fn info(
        &self,
        title: impl Into<String>,
        message: Option<String>,
        duration: Option<Duration>,
    ) -> String {
        self.show(ToastKind::Info, title, message, duration)
    }

    /// Show a toast and return its id.
    pub fn show(
        &self,
        kind: ToastKind,
        title: impl Into<String>,
        message: Option<String>,
        duration: Option<Duration>,
    ) -> String {
        let duration = duration.unwrap_or(self.inner.default_duration);
        let id = format!(
            "toast-{}",
            self.inner.next_id.fetch_add(1, Ordering::Relaxed)
        );
        let toast = Toast {
            id: id.clone(),
            kind,
            title: title.into(),
            message,
            duration: Some(duration.as_millis() as u64),
        };

        let snapshot = {
            let mut toasts = self.inner.toasts.lock().unwrap();
            toasts.push(toast);
            toasts.clone()
        };
        self.inner.subscribers.notify(&snapshot);

        if !duration.is_zero() {
            self.schedule_expiry(id.clone(), duration);
        }
        id
    }

    fn schedule_expiry(&self, id: String, duration: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime available, toast {} will not expire", id);
            return;
        };
        let weak: Weak<ToastInner> = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                inner.remove(&id);
            }
        });
    }

    /// Remove a toast. Returns false if it was already gone.
    pub fn remove(&self, id: &str) -> bool {
        self.inner.remove(id)
    }

    pub fn clear(&self) {
        self.inner.toasts.lock().unwrap().clear();
        self.inner.subscribers.notify(&[]);
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.toasts.lock().unwrap().clone()
    }

    /// Register a listener, invoked immediately with the current toasts and
    /// again on every change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Toast]) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let subscription = self.inner.subscribers.add(callback.clone());
        callback(&self.toasts());
        subscription
    }
}

impl Default for ToastChannel {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_for_notification_type() {
        assert_eq!(ToastKind::from(NotificationType::NewTicket), ToastKind::Info);
        assert_eq!(ToastKind::from(NotificationType::NewMessage), ToastKind::Info);
        assert_eq!(ToastKind::from(NotificationType::StatusChange), ToastKind::Success);
        assert_eq!(ToastKind::from(NotificationType::Assignment), ToastKind::Info);
        assert_eq!(ToastKind::from(NotificationType::TicketUpdate), ToastKind::Info);
    }

    #[test]
    fn test_show_remove_clear_without_runtime() {
        let channel = ToastChannel::default();

        let a = channel.success("Saved", None, None);
        let b = channel.error("Failed", Some("try again".to_string()), None);
        let toasts = channel.toasts();
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].kind, ToastKind::Success);
        assert_eq!(toasts[0].duration, Some(3000));
        assert_eq!(toasts[1].message.as_deref(), Some("try again"));

        assert!(channel.remove(&a));
        assert!(!channel.remove(&a));
        assert_eq!(channel.toasts()[0].id, b);

        channel.info("Hello", None, None);
        channel.clear();
        assert!(channel.toasts().is_empty());
    }

    #[test]
    fn test_listener_receives_full_list() {
        let channel = ToastChannel::default();
        channel.info("first", None, None);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _subscription = channel.subscribe(move |toasts| {
            s.lock().unwrap().push(toasts.len());
        });

        let id = channel.info("second", None, None);
        channel.remove(&id);
        channel.clear();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn test_toast_wire_format() {
        let channel = ToastChannel::default();
        channel.success("Ticket status updated", Some("#1: open → closed".into()), None);

        let value = serde_json::to_value(&channel.toasts()[0]).unwrap();
        assert_eq!(value["type"], "success");
        assert_eq!(value["title"], "Ticket status updated");
        assert_eq!(value["duration"], 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_expires_after_duration() {
        let channel = ToastChannel::default();
        channel.info("short", None, Some(Duration::from_millis(500)));
        channel.info("default", None, None);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let titles: Vec<String> = channel.toasts().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["default".to_string()]);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(channel.toasts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_sticky() {
        let channel = ToastChannel::default();
        channel.error("sticky", None, Some(Duration::ZERO));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(channel.toasts().len(), 1);
    }
}
