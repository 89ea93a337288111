//! Lobby Collection
//!
//! Tracks every lobby under the lobbies root. Membership is driven only by
//! the store's child notifications: creating a lobby does not add it here,
//! the child-added echo does. Callers that create a lobby should navigate by
//! the key returned from [`LobbyCollection::create_lobby`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde_json::json;
use tracing::{debug, info};

use super::entity::Lobby;
use super::events::{EventEmitter, ListenerId};
use super::model::fields;
use super::{lock_read, lock_write};
use crate::config::ClientConfig;
use crate::store::{RemoteStore, Snapshot, StoreRef, WatchId, WatchKind};
use crate::validation::{require_non_empty, validate_lobby_name, ValidationError};

/// Kinds of collection events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectionEventKind {
    /// A lobby appeared.
    Create,
    /// A lobby disappeared.
    Remove,
}

/// Collection event payload.
#[derive(Clone, Debug)]
pub enum CollectionEvent {
    /// A named lobby was discovered.
    Create(Lobby),
    /// The lobby with this key was removed from the store.
    Remove(String),
}

impl CollectionEvent {
    /// Kind of this event.
    pub fn kind(&self) -> CollectionEventKind {
        match self {
            Self::Create(_) => CollectionEventKind::Create,
            Self::Remove(_) => CollectionEventKind::Remove,
        }
    }
}

struct CollectionInner {
    root: StoreRef,
    default_map: String,
    default_game_type: String,
    lobbies: RwLock<BTreeMap<String, Lobby>>,
    events: EventEmitter<CollectionEventKind, CollectionEvent>,
    watches: RwLock<Vec<WatchId>>,
}

impl CollectionInner {
    fn child_added(&self, snapshot: &Snapshot) {
        let key = snapshot.key();
        let Some(name) = snapshot.str_field(fields::NAME).filter(|n| !n.is_empty()) else {
            debug!(lobby = %key, "skipping unnamed lobby");
            return;
        };

        if lock_read(&self.lobbies).contains_key(key) {
            debug!(lobby = %key, "lobby already tracked");
            return;
        }

        let lobby = Lobby::with_snapshot(self.root.child(key), snapshot);
        lock_write(&self.lobbies).insert(key.to_string(), lobby.clone());
        info!(lobby = %key, %name, "lobby discovered");

        self.events
            .emit(CollectionEventKind::Create, &CollectionEvent::Create(lobby));
    }

    fn child_removed(&self, snapshot: &Snapshot) {
        let key = snapshot.key();
        let removed = lock_write(&self.lobbies).remove(key);
        if let Some(lobby) = removed {
            lobby.close();
            info!(lobby = %key, "lobby removed");
        }

        self.events.emit(
            CollectionEventKind::Remove,
            &CollectionEvent::Remove(key.to_string()),
        );
    }

    fn release(&self) {
        for id in lock_write(&self.watches).drain(..) {
            self.root.unwatch(id);
        }
    }
}

impl Drop for CollectionInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// Live set of lobbies under the lobbies root.
#[derive(Clone)]
pub struct LobbyCollection {
    inner: Arc<CollectionInner>,
}

impl LobbyCollection {
    /// Start watching the lobbies root configured in `config`.
    pub fn new(store: Arc<dyn RemoteStore>, config: &ClientConfig) -> Self {
        Self::with_root(
            StoreRef::new(store, config.lobbies_root.as_str()),
            config,
        )
    }

    /// Start watching `root`, taking lobby defaults from `config`.
    pub fn with_root(root: StoreRef, config: &ClientConfig) -> Self {
        let inner = Arc::new(CollectionInner {
            root,
            default_map: config.default_map.clone(),
            default_game_type: config.default_game_type.clone(),
            lobbies: RwLock::new(BTreeMap::new()),
            events: EventEmitter::new(),
            watches: RwLock::new(Vec::new()),
        });

        let weak: Weak<CollectionInner> = Arc::downgrade(&inner);
        let added = inner.root.watch(WatchKind::ChildAdded, move |snapshot| {
            if let Some(inner) = weak.upgrade() {
                inner.child_added(snapshot);
            }
        });

        let weak: Weak<CollectionInner> = Arc::downgrade(&inner);
        let removed = inner.root.watch(WatchKind::ChildRemoved, move |snapshot| {
            if let Some(inner) = weak.upgrade() {
                inner.child_removed(snapshot);
            }
        });

        lock_write(&inner.watches).extend([added, removed]);
        debug!(root = %inner.root.path(), "watching lobbies");

        Self { inner }
    }

    /// Create a lobby in the store.
    ///
    /// Returns the new lobby's location; its `key()` identifies the lobby.
    /// The lobby shows up in this collection once the store reports it.
    pub fn create_lobby(&self, name: &str, owner: &str) -> Result<StoreRef, ValidationError> {
        validate_lobby_name(fields::NAME, name)?;
        require_non_empty(fields::OWNER, owner)?;

        let handle = self.inner.root.push(json!({
            "name": name,
            "owner": owner,
            "map": self.inner.default_map,
            "gameType": self.inner.default_game_type,
        }));
        info!(lobby = %handle.key(), %name, %owner, "lobby created");

        Ok(handle)
    }

    /// Look up a tracked lobby. No fetch from the store.
    pub fn get(&self, key: &str) -> Option<Lobby> {
        lock_read(&self.inner.lobbies).get(key).cloned()
    }

    /// Keys of all tracked lobbies.
    pub fn keys(&self) -> Vec<String> {
        lock_read(&self.inner.lobbies).keys().cloned().collect()
    }

    /// Number of tracked lobbies.
    pub fn len(&self) -> usize {
        lock_read(&self.inner.lobbies).len()
    }

    /// True when no lobby is tracked.
    pub fn is_empty(&self) -> bool {
        lock_read(&self.inner.lobbies).is_empty()
    }

    /// Register a listener.
    pub fn on<F>(&self, kind: CollectionEventKind, callback: F) -> ListenerId
    where
        F: Fn(&CollectionEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, callback)
    }

    /// Listen for discovered lobbies.
    pub fn on_create<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&Lobby) + Send + Sync + 'static,
    {
        self.on(CollectionEventKind::Create, move |event| {
            if let CollectionEvent::Create(lobby) = event {
                callback(lobby);
            }
        })
    }

    /// Listen for removed lobby keys.
    pub fn on_remove<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on(CollectionEventKind::Remove, move |event| {
            if let CollectionEvent::Remove(key) = event {
                callback(key.as_str());
            }
        })
    }

    /// Remove one registration; `None` if it was not registered.
    pub fn off(&self, kind: CollectionEventKind, id: ListenerId) -> Option<ListenerId> {
        self.inner.events.off(kind, id)
    }

    /// Remove every listener.
    pub fn off_all_listeners(&self) {
        self.inner.events.off_all();
    }

    /// Stop watching the root and close every tracked lobby.
    pub fn close(&self) {
        self.inner.release();
        self.inner.events.off_all();

        let lobbies = std::mem::take(&mut *lock_write(&self.inner.lobbies));
        for lobby in lobbies.values() {
            lobby.close();
        }
        debug!(root = %self.inner.root.path(), closed = lobbies.len(), "collection closed");
    }
}

impl fmt::Debug for LobbyCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LobbyCollection")
            .field("root", self.inner.root.path())
            .field("lobbies", &self.keys())
            .finish()
    }
}
