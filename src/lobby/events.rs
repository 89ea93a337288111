//! Local Event Registry
//!
//! Per-instance listener lists keyed by event kind. Listeners for a kind run
//! in registration order; registering the same closure twice yields two
//! independent registrations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::{lock_read, lock_write};

/// Handle returned by `on`, used to remove exactly that registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Listener registry for events of kind `K` carrying payload `P`.
pub struct EventEmitter<K, P> {
    listeners: RwLock<BTreeMap<K, Vec<(ListenerId, Listener<P>)>>>,
    next_id: AtomicU64,
}

impl<K: Ord + Copy, P> EventEmitter<K, P> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` for `kind`.
    pub fn on<F>(&self, kind: K, callback: F) -> ListenerId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock_write(&self.listeners)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove one registration. `None` if it is not registered for `kind`.
    pub fn off(&self, kind: K, id: ListenerId) -> Option<ListenerId> {
        let mut listeners = lock_write(&self.listeners);
        let list = listeners.get_mut(&kind)?;
        let index = list.iter().position(|(registered, _)| *registered == id)?;
        list.remove(index);
        Some(id)
    }

    /// Drop every registration of every kind.
    pub fn off_all(&self) {
        lock_write(&self.listeners).clear();
    }

    /// Number of registrations for `kind`.
    pub fn listener_count(&self, kind: K) -> usize {
        lock_read(&self.listeners)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every listener for `kind` with `payload`.
    ///
    /// The list is copied first, so listeners may register or remove
    /// listeners while running; such changes apply from the next emit.
    pub fn emit(&self, kind: K, payload: &P) -> usize {
        let listeners: Vec<Listener<P>> = lock_read(&self.listeners)
            .get(&kind)
            .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        for callback in &listeners {
            callback(payload);
        }
        listeners.len()
    }
}

impl<K: Ord + Copy, P> Default for EventEmitter<K, P> {
    fn default() -> Self {
        Self::new()
    }
}
