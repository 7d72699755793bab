// src/system/events.rs

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A subscriber interested in exactly one event code.
pub trait EventListener<E>: Send + Sync {
    fn interested_code(&self) -> i32;

    fn on_event(&self, code: i32, event: &E);
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<F> {
    code: i32,
    callback: F,
}

impl<F> FnListener<F> {
    pub fn new(code: i32, callback: F) -> Self {
        Self { code, callback }
    }
}

impl<E, F> EventListener<E> for FnListener<F>
where
    F: Fn(i32, &E) + Send + Sync,
{
    fn interested_code(&self) -> i32 {
        self.code
    }

    fn on_event(&self, code: i32, event: &E) {
        (self.callback)(code, event)
    }
}

/// Minimal pub/sub keyed by an integer event code.
///
/// Delivery requires an exact match between the fired code and the listener's
/// interested code. Listeners run synchronously on the firing thread, in
/// subscription order. Subscribing and firing may happen concurrently from any
/// thread; each firing works on a snapshot of the subscribers.
pub struct EventsDispatcher<E> {
    listeners: RwLock<Vec<Arc<dyn EventListener<E>>>>,
}

impl<E> Default for EventsDispatcher<E> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<E> fmt::Debug for EventsDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventsDispatcher")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<E> EventsDispatcher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `listener`. Returns `false` if that same listener is already subscribed.
    pub fn add_listener(&self, listener: Arc<dyn EventListener<E>>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unsubscribes `listener`. Returns `false` if it was not subscribed.
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener<E>>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every listener registered for exactly `code`.
    /// Returns how many listeners received it.
    pub fn fire_event(&self, code: i32, event: &E) -> usize {
        let snapshot: Vec<Arc<dyn EventListener<E>>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.interested_code() == code)
            .cloned()
            .collect();

        for listener in &snapshot {
            listener.on_event(code, event);
        }
        log::trace!("Event {} delivered to {} listener(s)", code, snapshot.len());
        snapshot.len()
    }
}
