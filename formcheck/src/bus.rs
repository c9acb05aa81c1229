//! Subscription bus for committed state changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::trace;

/// Listener callback invoked with each published value.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

type Listeners<T> = Mutex<Vec<(u64, Listener<T>)>>;

/// Synchronous fan-out of values to listeners.
///
/// Listeners may subscribe or unsubscribe while a notification is running;
/// the listener list is copied before iterating, so changes take effect from
/// the next notification. There is no replay: a new listener only sees
/// values published after it subscribed.
pub struct SubscriptionBus<T> {
    listeners: Arc<Listeners<T>>,
    next_id: AtomicU64,
}

impl<T> SubscriptionBus<T> {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Add a listener. Call [`Unsubscribe::unsubscribe`] on the returned
    /// handle to remove it.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::new(listener)));
        trace!("listener {} subscribed", id);
        Unsubscribe {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    /// Invoke every current listener with `value`.
    pub fn publish(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!("notifying {} listeners", listeners.len());
        for listener in listeners {
            listener(value);
        }
    }

    /// Number of current listeners.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Listener<T>)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for SubscriptionBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle removing a listener from its bus.
///
/// Dropping the handle keeps the listener subscribed.
#[must_use = "dropping the handle leaves the listener subscribed forever"]
pub struct Unsubscribe<T> {
    listeners: Weak<Listeners<T>>,
    id: u64,
}

impl<T> Unsubscribe<T> {
    /// Remove the listener. Does nothing if the bus is gone.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut guard = listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.retain(|(id, _)| *id != self.id);
            trace!("listener {} unsubscribed", self.id);
        }
    }
}
