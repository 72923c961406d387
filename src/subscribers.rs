//! Observer lists with detachable subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

pub type Callback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
}

/// A list of callbacks that receive the full current list of `T` on change.
pub struct SubscriberList<T> {
    entries: Arc<Mutex<Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T: 'static> SubscriberList<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` and return the handle that removes it again.
    pub fn add(&self, callback: Callback<T>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().unwrap().push(Entry { id, callback });

        let weak: Weak<Mutex<Vec<Entry<T>>>> = Arc::downgrade(&self.entries);
        Subscription {
            id,
            detach: Some(Box::new(move || {
                if let Some(entries) = weak.upgrade() {
                    entries.lock().unwrap().retain(|e| e.id != id);
                }
            })),
        }
    }

    /// Invoke every registered callback with `items`.
    ///
    /// Callbacks run outside the internal lock, so they may subscribe or
    /// unsubscribe without deadlocking.
    pub fn notify(&self, items: &[T]) {
        let callbacks: Vec<Callback<T>> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.callback.clone())
            .collect();
        for callback in callbacks {
            callback(items);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for SubscriberList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`. Call [`Subscription::unsubscribe`] to stop
/// receiving updates; dropping the handle keeps the subscription alive.
pub struct Subscription {
    id: u64,
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
