//! Topic-keyed publish/subscribe channel.
//!
//! Emission is synchronous: [`EventChannel::emit`] runs every handler
//! subscribed to the topic, in subscription order, before it returns.
//! There is no buffering, so a handler only sees emissions that happen
//! while it is subscribed.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Handler<P> = Arc<dyn Fn(&P) + Send + Sync>;

struct Registry<K, P> {
    next_id: u64,
    handlers: HashMap<K, Vec<(u64, Handler<P>)>>,
}

impl<K, P> Default for Registry<K, P> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: HashMap::new(),
        }
    }
}

fn lock<K, P>(registry: &Mutex<Registry<K, P>>) -> MutexGuard<'_, Registry<K, P>> {
    // Handlers never run under the lock, so a poisoned registry is still consistent.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by [`EventChannel::subscribe`].
///
/// Dropping it leaves the handler subscribed; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the handler. A no-op if the channel no longer exists.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// A publish/subscribe channel keyed by topic.
///
/// Cloning yields another handle to the same set of subscribers.
pub struct EventChannel<K, P> {
    registry: Arc<Mutex<Registry<K, P>>>,
}

impl<K, P> Clone for EventChannel<K, P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<K, P> Default for EventChannel<K, P> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }
}

impl<K, P> EventChannel<K, P>
where
    K: Eq + Hash + Clone + Send + 'static,
    P: 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`.
    pub fn subscribe<F>(&self, topic: K, handler: F) -> Subscription
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .handlers
                .entry(topic.clone())
                .or_default()
                .push((id, Arc::new(handler)));
            id
        };

        let weak: Weak<Mutex<Registry<K, P>>> = Arc::downgrade(&self.registry);
        Subscription {
            remove: Some(Box::new(move || {
                let Some(registry) = weak.upgrade() else {
                    return;
                };
                let mut registry = lock(&registry);
                if let Some(list) = registry.handlers.get_mut(&topic) {
                    list.retain(|(handler_id, _)| *handler_id != id);
                    if list.is_empty() {
                        registry.handlers.remove(&topic);
                    }
                }
            })),
        }
    }

    /// Invoke every handler currently subscribed to `topic`.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe,
    /// unsubscribe or emit themselves; such changes apply from the next
    /// emission on.
    pub fn emit(&self, topic: &K, payload: &P) {
        let handlers: Vec<Handler<P>> = {
            let registry = lock(&self.registry);
            match registry.handlers.get(topic) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };

        for handler in handlers {
            handler(payload);
        }
    }

    /// Number of handlers subscribed to `topic`.
    pub fn handler_count(&self, topic: &K) -> usize {
        lock(&self.registry)
            .handlers
            .get(topic)
            .map_or(0, Vec::len)
    }
}
