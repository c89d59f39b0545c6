use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;

/// Callback type for value change notifications.
pub type ChangeHandler<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

/// Unique handle for a subscription, returned by `LiveValue::subscribe()`.
///
/// Use this to unsubscribe later via `LiveValue::unsubscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Single observable value, replaced wholesale on every publish.
///
/// - `set(value)` replaces the value and notifies all subscribers.
/// - `get()` reads the current value (Arc clone, cheap).
/// - `subscribe(handler)` registers a synchronous change handler.
/// - `watch()` / `wait_for()` observe changes asynchronously.
///
/// Backed by a `watch` channel: one current value, last write wins, and a
/// reader always sees a fully-formed snapshot. Earlier values are dropped,
/// not queued.
///
/// Publishes are serialized: subscribers are notified in the same order the
/// values were written, so the last value a subscriber sees is `get()`.
pub struct LiveValue<T> {
    tx: watch::Sender<Arc<T>>,
    handlers: RwLock<Vec<HandlerEntry<T>>>,
    /// Held across the write and the handler dispatch.
    publish: Mutex<()>,
    /// Monotonic counter for subscription IDs.
    next_id: AtomicU64,
    /// Number of publishes since construction.
    publishes: AtomicU64,
}

struct HandlerEntry<T> {
    id: SubscriptionId,
    handler: ChangeHandler<T>,
}

impl<T> Clone for HandlerEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T: Send + Sync + 'static> LiveValue<T> {
    /// Create a LiveValue holding `initial`. Construction is not a publish.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            tx,
            handlers: RwLock::new(Vec::new()),
            publish: Mutex::new(()),
            next_id: AtomicU64::new(1),
            publishes: AtomicU64::new(0),
        }
    }

    /// Get the current value.
    ///
    /// Returns an Arc clone (no data copy). The snapshot never changes;
    /// later publishes replace the value instead of mutating it.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.tx.borrow())
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.set_arc(Arc::new(value));
    }

    /// Replace the value with a pre-built Arc and notify subscribers.
    ///
    /// Handlers may read, subscribe or unsubscribe, but must not publish to
    /// the same `LiveValue`.
    pub fn set_arc(&self, value: Arc<T>) {
        let _publish = self.publish.lock().unwrap();
        self.tx.send_replace(Arc::clone(&value));
        self.publishes.fetch_add(1, Ordering::SeqCst);

        // Handlers run outside the handler-list lock so they may subscribe.
        let entries: Vec<HandlerEntry<T>> = self.handlers.read().unwrap().clone();
        for entry in entries {
            (entry.handler)(&value);
        }
    }

    /// Subscribe to changes.
    ///
    /// The handler is called synchronously on the publishing thread after
    /// every `set`, including sets that store an equal value.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().unwrap().push(HandlerEntry {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Unsubscribe a handler. Unknown IDs are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.write().unwrap().retain(|e| e.id != id);
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().unwrap().len()
    }

    /// Receiver that observes every subsequent publish.
    pub fn watch(&self) -> watch::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    /// Wait until the current or a future value satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Arc<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(|v| predicate(&**v)).await {
            Ok(v) => Arc::clone(&v),
            // The sender lives as long as `self`.
            Err(_) => self.get(),
        }
    }

    /// Number of publishes since construction.
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::SeqCst)
    }
}

impl<T: Default + Send + Sync + 'static> Default for LiveValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for LiveValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveValue")
            .field("value", &*self.tx.borrow())
            .field("publishes", &self.publishes.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
