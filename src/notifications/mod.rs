//! Ticket notifications: models, durable storage, the log and toasts.

mod log;
mod models;
mod sqlite_store;
mod store;
mod toast;

pub use log::{merge_notifications, LogSettings, NotificationLog};
pub use models::{Notification, NotificationDraft, NotificationPriority, NotificationType};
pub use sqlite_store::{viewer_key, SqliteNotificationStore, NOTIFICATIONS_KEY};
pub use store::{InMemoryNotificationStore, NotificationStore};
pub use toast::{Toast, ToastChannel, ToastKind, DEFAULT_TOAST_DURATION};
