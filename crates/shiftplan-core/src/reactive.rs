//! Listener registry shared by the stores, the navigator and the event bus.
//!
//! Callbacks run synchronously on the notifying task, after the owner has
//! released its own state lock. The registry is copied before dispatch, so a
//! callback may subscribe, unsubscribe or trigger another notification.
//!
//! Owners that notify from several threads stamp each snapshot with a version
//! taken under their lock and use [`Listeners::notify_versioned`], so a
//! snapshot is never handed out after a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Table<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Set of callbacks notified with `&T`.
pub struct Listeners<T> {
    table: Arc<Mutex<Table<T>>>,
    delivered: Arc<AtomicU64>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_id: 0,
                entries: Vec::new(),
            })),
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers a callback. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut table = lock(&self.table);
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Table<T>>> = Arc::downgrade(&self.table);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(table) = weak.upgrade() {
                    lock(&table).entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Invokes every registered callback with `value`.
    pub fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = lock(&self.table)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    /// Notifies with `value` unless a version at least as new was already
    /// delivered. Returns whether the callbacks ran.
    pub fn notify_versioned(&self, version: u64, value: &T) -> bool {
        if self.delivered.fetch_max(version, Ordering::SeqCst) >= version {
            tracing::trace!(version, "dropping superseded notification");
            return false;
        }
        self.notify(value);
        true
    }

    pub fn len(&self) -> usize {
        lock(&self.table).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            delivered: Arc::clone(&self.delivered),
        }
    }
}

// A panicking listener must not wedge every later notification.
fn lock<T>(table: &Mutex<Table<T>>) -> std::sync::MutexGuard<'_, Table<T>> {
    table
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Handle returned by `subscribe`. Dropping it removes the callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Removes the callback now.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Keeps the callback registered for the lifetime of its registry.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
