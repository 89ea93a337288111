//! In-Memory Store
//!
//! A process-local document tree that implements [`RemoteStore`] with the
//! delivery behaviour the lobby layer expects from the hosted service:
//!
//! - writes apply immediately, notifications are queued
//! - [`MemoryStore::flush`] delivers the queue in order, one callback at a time
//! - every client gets its own [`MemoryConnection`]; dropping a connection
//!   with [`MemoryConnection::disconnect`] runs that client's deferred removals
//!
//! `null` and empty objects are never stored, so removing the last player
//! of a roster removes the `players` node as well.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tracing::debug;

use super::snapshot::is_absent;
use super::{Fields, RemoteStore, Snapshot, SnapshotCallback, StorePath, WatchId, WatchKind};

/// Identifies a client connection.
pub type ConnectionId = u64;

struct Watch {
    path: StorePath,
    kind: WatchKind,
    callback: SnapshotCallback,
}

struct Delivery {
    watch: WatchId,
    snapshot: Snapshot,
}

/// Shared tree, subscriptions and delivery queue.
struct Backend {
    tree: Value,
    watches: BTreeMap<WatchId, Watch>,
    queue: VecDeque<Delivery>,
    disconnect_hooks: BTreeMap<ConnectionId, Vec<StorePath>>,
    next_watch: u64,
    next_connection: ConnectionId,
    write_count: u64,
}

impl Backend {
    fn new() -> Self {
        Self {
            tree: Value::Object(Map::new()),
            watches: BTreeMap::new(),
            queue: VecDeque::new(),
            disconnect_hooks: BTreeMap::new(),
            next_watch: 0,
            next_connection: 0,
            write_count: 0,
        }
    }

    fn get(&self, path: &StorePath) -> Option<&Value> {
        let mut node = &self.tree;
        for segment in path.segments() {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    /// Apply a batch of writes and queue the resulting notifications.
    fn apply(&mut self, writes: Vec<(StorePath, Option<Value>)>) {
        let touched: Vec<(WatchId, Option<Value>)> = self
            .watches
            .iter()
            .filter(|(_, w)| writes.iter().any(|(p, _)| p.overlaps(&w.path)))
            .map(|(id, w)| (*id, self.get(&w.path).cloned()))
            .collect();

        for (path, value) in writes {
            set_at(&mut self.tree, path.segments(), value.and_then(normalize));
        }
        self.write_count += 1;

        for (id, before) in touched {
            let Some(watch) = self.watches.get(&id) else { continue };
            let after = self.get(&watch.path).cloned();
            let snapshots = notifications(watch, before.as_ref(), after.as_ref());
            self.queue
                .extend(snapshots.into_iter().map(|snapshot| Delivery { watch: id, snapshot }));
        }
    }

    /// Notifications a new subscription receives for data already stored.
    fn initial(&self, path: &StorePath, kind: WatchKind) -> Vec<Snapshot> {
        let current = self.get(path).cloned();
        match kind {
            WatchKind::Value => vec![Snapshot::new(path.key(), current)],
            WatchKind::ChildAdded => children(current.as_ref())
                .into_iter()
                .map(|(key, value)| Snapshot::new(key, Some(value)))
                .collect(),
            WatchKind::ChildChanged | WatchKind::ChildRemoved => Vec::new(),
        }
    }
}

/// Notifications raised for `watch` by a change from `before` to `after`.
fn notifications(watch: &Watch, before: Option<&Value>, after: Option<&Value>) -> Vec<Snapshot> {
    if watch.kind == WatchKind::Value {
        return vec![Snapshot::new(watch.path.key(), after.cloned())];
    }

    let old = children(before);
    let new = children(after);

    match watch.kind {
        WatchKind::ChildAdded => new
            .into_iter()
            .filter(|(key, _)| !old.contains_key(key))
            .map(|(key, value)| Snapshot::new(key, Some(value)))
            .collect(),
        WatchKind::ChildRemoved => old
            .into_iter()
            .filter(|(key, _)| !new.contains_key(key))
            .map(|(key, value)| Snapshot::new(key, Some(value)))
            .collect(),
        WatchKind::ChildChanged => new
            .into_iter()
            .filter(|(key, value)| old.get(key).is_some_and(|prev| prev != value))
            .map(|(key, value)| Snapshot::new(key, Some(value)))
            .collect(),
        WatchKind::Value => Vec::new(),
    }
}

fn children(value: Option<&Value>) -> BTreeMap<String, Value> {
    match value {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => BTreeMap::new(),
    }
}

/// Strip nulls and empty objects; `None` if nothing is left.
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other if is_absent(&other) => None,
        other => Some(other),
    }
}

/// Write `value` at `segments` below `node`, pruning emptied parents.
fn set_at(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or_else(|| Value::Object(Map::new()));
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else { return };

    if rest.is_empty() {
        match value {
            Some(value) => {
                map.insert(head.clone(), value);
            }
            None => {
                map.remove(head);
            }
        }
        return;
    }

    if value.is_none() && !map.contains_key(head) {
        return;
    }
    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    set_at(child, rest, value);
    if is_absent(child) {
        map.remove(head);
    }
}

fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Process-local store shared by any number of connections.
#[derive(Clone)]
pub struct MemoryStore {
    backend: Arc<Mutex<Backend>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            backend: Arc::new(Mutex::new(Backend::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a client connection.
    pub fn connect(&self) -> Arc<MemoryConnection> {
        let id = {
            let mut backend = self.lock();
            backend.next_connection += 1;
            backend.next_connection
        };
        debug!(connection = id, "client connected");

        Arc::new(MemoryConnection {
            id,
            store: self.clone(),
        })
    }

    /// Deliver every queued notification, including ones raised by the
    /// callbacks themselves. Returns how many callbacks ran.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;

        loop {
            let next = {
                let mut backend = self.lock();
                let Some(delivery) = backend.queue.pop_front() else { break };
                let callback = backend.watches.get(&delivery.watch).map(|w| w.callback.clone());
                callback.map(|callback| (callback, delivery.snapshot))
            };

            // Cancelled subscriptions swallow what was already queued.
            if let Some((callback, snapshot)) = next {
                callback(&snapshot);
                delivered += 1;
            }
        }

        delivered
    }

    /// Notifications waiting for [`flush`](Self::flush).
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Current value stored at `path`.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        self.lock().get(&StorePath::parse(path)).cloned()
    }

    /// Number of write batches applied so far.
    pub fn write_count(&self) -> u64 {
        self.lock().write_count
    }

    /// Number of open subscriptions.
    pub fn watch_count(&self) -> usize {
        self.lock().watches.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One client's view of a [`MemoryStore`].
pub struct MemoryConnection {
    id: ConnectionId,
    store: MemoryStore,
}

impl MemoryConnection {
    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The shared store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Simulate losing the connection: every deferred removal registered
    /// through this connection runs. Returns how many ran.
    pub fn disconnect(&self) -> usize {
        let mut backend = self.store.lock();
        let hooks = backend.disconnect_hooks.remove(&self.id).unwrap_or_default();
        let fired = hooks.len();

        if fired > 0 {
            backend.apply(hooks.into_iter().map(|path| (path, None)).collect());
        }
        debug!(connection = self.id, fired, "client disconnected");

        fired
    }
}

impl RemoteStore for MemoryConnection {
    fn watch(&self, path: &StorePath, kind: WatchKind, callback: SnapshotCallback) -> WatchId {
        let mut backend = self.store.lock();
        backend.next_watch += 1;
        let id = WatchId(backend.next_watch);

        let initial = backend.initial(path, kind);
        backend
            .queue
            .extend(initial.into_iter().map(|snapshot| Delivery { watch: id, snapshot }));
        backend.watches.insert(
            id,
            Watch {
                path: path.clone(),
                kind,
                callback,
            },
        );
        debug!(connection = self.id, %path, ?kind, watch = id.0, "watch opened");

        id
    }

    fn unwatch(&self, id: WatchId) {
        let mut backend = self.store.lock();
        if backend.watches.remove(&id).is_some() {
            debug!(connection = self.id, watch = id.0, "watch closed");
        }
    }

    fn update(&self, path: &StorePath, fields: Fields) {
        let writes = fields
            .into_iter()
            .map(|(field, value)| (path.join(&field), Some(value)))
            .collect::<Vec<_>>();
        if writes.is_empty() {
            return;
        }
        debug!(connection = self.id, %path, fields = writes.len(), "update");
        self.store.lock().apply(writes);
    }

    fn remove(&self, path: &StorePath) {
        debug!(connection = self.id, %path, "remove");
        self.store.lock().apply(vec![(path.clone(), None)]);
    }

    fn push(&self, path: &StorePath, value: Value) -> String {
        let key = generate_key();
        debug!(connection = self.id, %path, %key, "push");
        self.store.lock().apply(vec![(path.join(&key), Some(value))]);
        key
    }

    fn on_disconnect_remove(&self, path: &StorePath) {
        let mut backend = self.store.lock();
        let hooks = backend.disconnect_hooks.entry(self.id).or_default();
        if !hooks.contains(path) {
            hooks.push(path.clone());
        }
    }

    fn cancel_on_disconnect(&self, path: &StorePath) {
        let mut backend = self.store.lock();
        if let Some(hooks) = backend.disconnect_hooks.get_mut(&self.id) {
            hooks.retain(|hook| !path.is_ancestor_or_self(hook));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRef;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<Snapshot>>>, impl Fn(&Snapshot) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |snap: &Snapshot| sink.lock().unwrap().push(snap.clone()))
    }

    #[test]
    fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let lobby = StoreRef::new(store.connect(), "lobbies/abc");

        lobby.update_field("name", "Arena");
        lobby.update_field("map", "forest");
        lobby.update_field("name", "Arena 2");

        assert_eq!(
            store.value_at("lobbies/abc"),
            Some(json!({"name": "Arena 2", "map": "forest"}))
        );
        assert_eq!(store.write_count(), 3);
    }

    #[test]
    fn test_null_field_deletes() {
        let store = MemoryStore::new();
        let lobby = StoreRef::new(store.connect(), "lobbies/abc");

        lobby.update_field("name", "Arena");
        lobby.update_field("map", "forest");
        lobby.update_field("map", Value::Null);

        assert_eq!(store.value_at("lobbies/abc"), Some(json!({"name": "Arena"})));
    }

    #[test]
    fn test_remove_prunes_empty_parents() {
        let store = MemoryStore::new();
        let lobby = StoreRef::new(store.connect(), "lobbies/abc");

        lobby.child("players").update_field("u1", json!({"name": "Foo"}));
        lobby.update_field("name", "Arena");
        lobby.child("players/u1").remove();

        assert_eq!(store.value_at("lobbies/abc/players"), None);
        assert_eq!(store.value_at("lobbies/abc/name"), Some(json!("Arena")));
    }

    #[test]
    fn test_value_watch_delivers_initial_then_changes() {
        let store = MemoryStore::new();
        let conn = store.connect();
        let lobby = StoreRef::new(conn.clone(), "lobbies/abc");
        let (seen, callback) = recorder();

        lobby.watch(WatchKind::Value, callback);
        assert_eq!(store.flush(), 1);
        assert!(!seen.lock().unwrap()[0].exists());

        lobby.update_field("name", "Arena");
        lobby.child("players/u1").update_field("name", "Foo");
        // Sibling writes are not delivered
        StoreRef::new(conn, "lobbies/other").update_field("name", "Nope");
        assert_eq!(store.flush(), 2);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[1].key(), "abc");
        assert_eq!(seen[2].val(), json!({"name": "Arena", "players": {"u1": {"name": "Foo"}}}));
    }

    #[test]
    fn test_child_events() {
        let store = MemoryStore::new();
        let root = StoreRef::new(store.connect(), "lobbies");
        root.child("first").update_field("name", "First");

        let (added, on_added) = recorder();
        let (removed, on_removed) = recorder();
        let (changed, on_changed) = recorder();
        root.watch(WatchKind::ChildAdded, on_added);
        root.watch(WatchKind::ChildRemoved, on_removed);
        root.watch(WatchKind::ChildChanged, on_changed);

        let second = root.push(json!({"name": "Second"}));
        root.child("first").update_field("map", "forest");
        root.child("first").remove();
        store.flush();

        let added = added.lock().unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].key(), "first");
        assert_eq!(added[1].key(), second.key());
        assert_eq!(added[1].str_field("name"), Some("Second"));

        let removed = removed.lock().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].key(), "first");
        assert_eq!(removed[0].str_field("map"), Some("forest"));

        assert_eq!(changed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unwatch_swallows_queued() {
        let store = MemoryStore::new();
        let lobby = StoreRef::new(store.connect(), "lobbies/abc");
        let (seen, callback) = recorder();

        let id = lobby.watch(WatchKind::Value, callback);
        lobby.update_field("name", "Arena");
        assert_eq!(store.pending(), 2);

        lobby.unwatch(id);
        assert_eq!(store.flush(), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.watch_count(), 0);
    }

    #[test]
    fn test_disconnect_runs_only_own_hooks() {
        let store = MemoryStore::new();
        let host = store.connect();
        let guest = store.connect();
        let players = StoreRef::new(host.clone(), "lobbies/abc/players");

        players.update_field("u1", json!({"name": "Host"}));
        players.update_field("u2", json!({"name": "Guest"}));
        StoreRef::new(host.clone(), "lobbies/abc/players/u1").on_disconnect().remove();
        StoreRef::new(guest.clone(), "lobbies/abc/players/u2").on_disconnect().remove();

        assert_eq!(guest.disconnect(), 1);
        assert_eq!(store.value_at("lobbies/abc/players"), Some(json!({"u1": {"name": "Host"}})));

        // Hooks fire once
        assert_eq!(guest.disconnect(), 0);
    }

    #[test]
    fn test_cancel_on_disconnect() {
        let store = MemoryStore::new();
        let conn = store.connect();
        let player = StoreRef::new(conn.clone(), "lobbies/abc/players/u1");

        player.update_field("name", "Foo");
        player.on_disconnect().remove();
        player.on_disconnect().cancel();

        assert_eq!(conn.disconnect(), 0);
        assert!(store.value_at("lobbies/abc/players/u1").is_some());
    }

    #[test]
    fn test_callbacks_may_write() {
        let store = MemoryStore::new();
        let conn = store.connect();
        let counter = StoreRef::new(conn.clone(), "counter");
        let writer = counter.clone();

        counter.watch(WatchKind::Value, move |snap| {
            let n = snap.val().get("n").and_then(Value::as_u64).unwrap_or(0);
            if n < 3 {
                writer.update_field("n", n + 1);
            }
        });

        // initial + three echoes
        assert_eq!(store.flush(), 4);
        assert_eq!(store.value_at("counter/n"), Some(json!(3)));
    }
}
