//! Remote Store Capability
//!
//! The document-tree service the lobby layer synchronizes against.
//! Transport, auth and durability belong to the implementation; this layer
//! only relies on the operations of [`RemoteStore`].
//!
//! Writes are fire-and-forget: none of the operations report failure, and
//! the only feedback is the subscription re-delivering the stored state.

pub mod memory;
pub mod path;
pub mod snapshot;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

pub use memory::{MemoryConnection, MemoryStore};
pub use path::StorePath;
pub use snapshot::Snapshot;

/// Field map for partial updates.
pub type Fields = Map<String, Value>;

/// Callback invoked for each snapshot a subscription delivers.
pub type SnapshotCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Identifies an open subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub u64);

/// Which notifications a subscription receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Whole-subtree value, on every write that touches it.
    Value,
    /// A direct child appeared.
    ChildAdded,
    /// A direct child's value changed.
    ChildChanged,
    /// A direct child disappeared.
    ChildRemoved,
}

/// Operations consumed from the remote store.
pub trait RemoteStore: Send + Sync {
    /// Subscribe to notifications at `path`.
    ///
    /// Existing data is delivered as the first notification(s): one value
    /// snapshot for [`WatchKind::Value`], one event per child for
    /// [`WatchKind::ChildAdded`].
    fn watch(&self, path: &StorePath, kind: WatchKind, callback: SnapshotCallback) -> WatchId;

    /// Cancel a subscription. Queued notifications for it are dropped.
    fn unwatch(&self, id: WatchId);

    /// Merge top-level `fields` into the document at `path`.
    /// A `null` field value deletes that field.
    fn update(&self, path: &StorePath, fields: Fields);

    /// Delete the subtree at `path`.
    fn remove(&self, path: &StorePath);

    /// Store `value` under a new unique child of `path`; returns the key.
    fn push(&self, path: &StorePath, value: Value) -> String;

    /// Delete `path` when this client's connection is lost.
    fn on_disconnect_remove(&self, path: &StorePath);

    /// Withdraw pending disconnect operations registered at `path`.
    fn cancel_on_disconnect(&self, path: &StorePath);
}

/// A location in a remote store.
#[derive(Clone)]
pub struct StoreRef {
    store: Arc<dyn RemoteStore>,
    path: StorePath,
}

impl StoreRef {
    /// Reference `path` in `store`.
    pub fn new(store: Arc<dyn RemoteStore>, path: impl Into<StorePath>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    /// Reference a descendant.
    pub fn child(&self, relative: &str) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.join(relative),
        }
    }

    /// Last segment of the path.
    pub fn key(&self) -> &str {
        self.path.key()
    }

    /// Full path.
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Subscribe to notifications here.
    pub fn watch<F>(&self, kind: WatchKind, callback: F) -> WatchId
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.store.watch(&self.path, kind, Arc::new(callback))
    }

    /// Cancel a subscription opened through any handle on this store.
    pub fn unwatch(&self, id: WatchId) {
        self.store.unwatch(id);
    }

    /// Partial update of top-level fields.
    pub fn update(&self, fields: Fields) {
        self.store.update(&self.path, fields);
    }

    /// Set a single top-level field.
    pub fn update_field(&self, field: &str, value: impl Into<Value>) {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), value.into());
        self.update(fields);
    }

    /// Delete this subtree.
    pub fn remove(&self) {
        self.store.remove(&self.path);
    }

    /// Append under a generated key and return the new child.
    pub fn push(&self, value: Value) -> StoreRef {
        let key = self.store.push(&self.path, value);
        self.child(&key)
    }

    /// Operations deferred until the connection drops.
    pub fn on_disconnect(&self) -> OnDisconnect<'_> {
        OnDisconnect { target: self }
    }
}

impl fmt::Debug for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRef").field("path", &self.path).finish()
    }
}

/// Deferred operations for a [`StoreRef`].
pub struct OnDisconnect<'a> {
    target: &'a StoreRef,
}

impl OnDisconnect<'_> {
    /// Remove the location once the connection is lost.
    pub fn remove(&self) {
        self.target.store.on_disconnect_remove(&self.target.path);
    }

    /// Withdraw any deferred operation on the location.
    pub fn cancel(&self) {
        self.target.store.cancel_on_disconnect(&self.target.path);
    }
}
