//! Module-level named event channel
//!
//! The overlay browser reports intermediate URLs through a channel that is not
//! tied to any view. Listeners subscribe by event name and receive a
//! [`Subscription`] that removes them again, either explicitly or on drop.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};

use log::trace;

use crate::NavigationEvent;

/// Event name the overlay browser emits URL changes under
pub const URL_CHANGE_EVENT: &str = "onUrlChange";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Default)]
struct CallState {
    removed: bool,
    /// Threads currently running this listener
    callers: Vec<ThreadId>,
}

/// One registered listener
///
/// Once `remove` returns, the listener is not running and never runs again.
struct ListenerEntry {
    id: u64,
    callback: Box<dyn Fn(&NavigationEvent) + Send + Sync>,
    state: Mutex<CallState>,
    idle: Condvar,
}

impl ListenerEntry {
    fn call(&self, payload: &NavigationEvent) -> bool {
        let me = thread::current().id();
        {
            let mut state = lock(&self.state);
            if state.removed {
                return false;
            }
            state.callers.push(me);
        }

        (self.callback)(payload);

        let mut state = lock(&self.state);
        if let Some(pos) = state.callers.iter().position(|caller| *caller == me) {
            state.callers.swap_remove(pos);
        }
        self.idle.notify_all();
        true
    }

    /// Marks the listener removed and waits for calls on other threads to finish
    ///
    /// A listener removing itself from inside its own call does not wait on itself.
    fn retire(&self) {
        let me = thread::current().id();
        let mut state = lock(&self.state);
        state.removed = true;
        while state.callers.iter().any(|caller| *caller != me) {
            state = match self.idle.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_event: HashMap<String, Vec<Arc<ListenerEntry>>>,
    added: u64,
    removed: u64,
}

/// Named event channel shared between the native host and the application
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<Mutex<Listeners>>,
}

impl EventEmitter {
    /// Creates an emitter with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event`
    pub fn add_listener<F>(&self, event: &str, listener: F) -> Subscription
    where
        F: Fn(&NavigationEvent) + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.listeners);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.added += 1;
        listeners
            .by_event
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(ListenerEntry {
                id,
                callback: Box::new(listener),
                state: Mutex::default(),
                idle: Condvar::new(),
            }));
        trace!("listener {id} added for {event}");

        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            event: event.to_string(),
            id,
            active: true,
        }
    }

    /// Delivers `payload` to every listener of `event`, in subscription order
    ///
    /// Returns how many listeners were invoked. Listeners run outside the
    /// table lock, so they may subscribe or unsubscribe freely; a listener
    /// removed while this call is in progress is skipped.
    pub fn emit(&self, event: &str, payload: &NavigationEvent) -> usize {
        let targets: Vec<Arc<ListenerEntry>> = lock(&self.listeners)
            .by_event
            .get(event)
            .map(|entries| entries.iter().map(Arc::clone).collect())
            .unwrap_or_default();

        targets
            .iter()
            .filter(|entry| entry.call(payload))
            .count()
    }

    /// Number of live listeners for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        lock(&self.listeners)
            .by_event
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Total subscriptions ever created on this emitter
    pub fn subscriptions_added(&self) -> u64 {
        lock(&self.listeners).added
    }

    /// Total subscriptions ever released on this emitter
    pub fn subscriptions_removed(&self) -> u64 {
        lock(&self.listeners).removed
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = lock(&self.listeners);
        f.debug_struct("EventEmitter")
            .field("events", &listeners.by_event.keys().collect::<Vec<_>>())
            .field("added", &listeners.added)
            .field("removed", &listeners.removed)
            .finish()
    }
}

/// Registration of one listener on an [`EventEmitter`]
///
/// Released exactly once: by [`Subscription::remove`] or when dropped.
pub struct Subscription {
    listeners: Weak<Mutex<Listeners>>,
    event: String,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Removes the listener; further calls do nothing
    ///
    /// Blocks until calls to the listener running on other threads have
    /// returned, so no call can start or still be running afterwards.
    pub fn remove(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };

        let entry = {
            let mut listeners = lock(&listeners);
            let mut entry = None;
            if let Some(entries) = listeners.by_event.get_mut(&self.event) {
                if let Some(pos) = entries.iter().position(|e| e.id == self.id) {
                    entry = Some(entries.remove(pos));
                }
                if entries.is_empty() {
                    listeners.by_event.remove(&self.event);
                }
            }
            listeners.removed += 1;
            entry
        };

        if let Some(entry) = entry {
            entry.retire();
        }
        trace!("listener {} removed from {}", self.id, self.event);
    }

    /// Whether the listener is still registered
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn emit_reaches_only_matching_listeners() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _sub = emitter.add_listener(URL_CHANGE_EVENT, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(emitter.emit(URL_CHANGE_EVENT, &NavigationEvent::new("a")), 1);
        assert_eq!(emitter.emit("onSomethingElse", &NavigationEvent::new("b")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let emitter = EventEmitter::new();
        let mut sub = emitter.add_listener(URL_CHANGE_EVENT, |_| {});
        assert_eq!(emitter.listener_count(URL_CHANGE_EVENT), 1);

        sub.remove();
        sub.remove();
        drop(sub);

        assert_eq!(emitter.listener_count(URL_CHANGE_EVENT), 0);
        assert_eq!(emitter.subscriptions_removed(), 1);
    }

    #[test]
    fn drop_releases_listener() {
        let emitter = EventEmitter::new();
        {
            let _sub = emitter.add_listener(URL_CHANGE_EVENT, |_| {});
        }
        assert_eq!(emitter.listener_count(URL_CHANGE_EVENT), 0);
        assert_eq!(emitter.subscriptions_added(), 1);
        assert_eq!(emitter.subscriptions_removed(), 1);
    }

    #[test]
    fn subscription_outliving_emitter_is_harmless() {
        let emitter = EventEmitter::new();
        let mut sub = emitter.add_listener(URL_CHANGE_EVENT, |_| {});
        drop(emitter);
        sub.remove();
        assert!(!sub.is_active());
    }

    #[test]
    fn listeners_may_unsubscribe_while_emitting() {
        let emitter = EventEmitter::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&slot);
        let sub = emitter.add_listener(URL_CHANGE_EVENT, move |_| {
            if let Some(mut sub) = inner.lock().unwrap().take() {
                sub.remove();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        assert_eq!(emitter.emit(URL_CHANGE_EVENT, &NavigationEvent::new("x")), 1);
        assert_eq!(emitter.listener_count(URL_CHANGE_EVENT), 0);
    }

    #[test]
    fn listener_removed_during_emit_is_skipped() {
        let emitter = EventEmitter::new();
        let inside = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let log = Arc::new(Mutex::new(Vec::new()));

        let (entered, resume) = (Arc::clone(&inside), Arc::clone(&release));
        let _blocker = emitter.add_listener(URL_CHANGE_EVENT, move |_| {
            entered.wait();
            resume.wait();
        });
        let sink = Arc::clone(&log);
        let mut late = emitter.add_listener(URL_CHANGE_EVENT, move |e| {
            sink.lock().unwrap().push(e.url.clone());
        });

        let native = emitter.clone();
        let emitting = thread::spawn(move || {
            native.emit(URL_CHANGE_EVENT, &NavigationEvent::new("https://mid.example"))
        });

        inside.wait();
        late.remove();
        log.lock().unwrap().push("removed".to_string());
        release.wait();

        assert_eq!(emitting.join().unwrap(), 1);
        assert_eq!(*log.lock().unwrap(), ["removed"]);
    }

    #[test]
    fn remove_waits_for_a_running_call() {
        let emitter = EventEmitter::new();
        let inside = Arc::new(Barrier::new(2));
        let log = Arc::new(Mutex::new(Vec::new()));

        let (entered, sink) = (Arc::clone(&inside), Arc::clone(&log));
        let mut sub = emitter.add_listener(URL_CHANGE_EVENT, move |_| {
            entered.wait();
            thread::sleep(Duration::from_millis(50));
            sink.lock().unwrap().push("call finished");
        });

        let native = emitter.clone();
        let emitting = thread::spawn(move || {
            native.emit(URL_CHANGE_EVENT, &NavigationEvent::new("https://a.example"));
        });

        inside.wait();
        sub.remove();
        log.lock().unwrap().push("removed");
        emitting.join().unwrap();

        assert_eq!(*log.lock().unwrap(), ["call finished", "removed"]);
    }
}
