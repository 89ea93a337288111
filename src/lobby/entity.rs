//! Synchronized Lobby
//!
//! A [`Lobby`] holds one subscription to its subtree and keeps a local copy
//! of the document. Writes follow a two-phase contract:
//!
//! 1. **Stage**: validate, write the local field, issue the remote update.
//! 2. **Commit**: the store echoes the subtree back; the snapshot replaces
//!    every local field and fires `change`.
//!
//! The snapshot routine is the only writer of cached fields besides the
//! staged setter write, so a writer sees its own change twice: once locally
//! (silently) and once through `change`, like every other observer.
//!
//! Roster operations (`add_player`, `remove_player`, ...) skip the staging
//! step entirely. The roster changes locally only when the echo arrives.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::events::{EventEmitter, ListenerId};
use super::model::{fields, LobbyData, LobbyPlayer, PlayerRef, RANDOM_SKIN};
use super::{lock_read, lock_write};
use crate::store::{Snapshot, StoreRef, WatchId, WatchKind};
use crate::validation::{require_non_empty, validate_key, validate_lobby_name, ValidationError};

/// Events a [`Lobby`] emits locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LobbyEvent {
    /// A remote snapshot replaced the lobby's fields. Payload: raw snapshot value.
    Change,
}

struct LobbyInner {
    key: String,
    handle: StoreRef,
    data: RwLock<LobbyData>,
    events: EventEmitter<LobbyEvent, Value>,
    watch: RwLock<Option<WatchId>>,
}

impl LobbyInner {
    /// Replace all cached fields from `snapshot` and notify listeners.
    fn apply_snapshot(&self, snapshot: &Snapshot) {
        let Some(payload) = snapshot.value() else {
            debug!(lobby = %self.key, "ignoring snapshot of missing lobby");
            return;
        };

        let (data, rejected) = LobbyData::from_stored(payload);
        if !rejected.is_empty() {
            warn!(lobby = %self.key, ?rejected, "dropping malformed roster entries");
        }

        *lock_write(&self.data) = data;
        let notified = self.events.emit(LobbyEvent::Change, payload);
        debug!(lobby = %self.key, notified, "lobby changed");
    }

    fn release(&self) {
        if let Some(id) = lock_write(&self.watch).take() {
            self.handle.unwatch(id);
        }
    }
}

impl Drop for LobbyInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// One lobby mirrored from the store.
///
/// Cloning is cheap; clones share state, listeners and the subscription.
/// The subscription ends on [`close`](Self::close) or when the last clone
/// is dropped.
#[derive(Clone)]
pub struct Lobby {
    inner: Arc<LobbyInner>,
}

impl Lobby {
    /// Mirror the lobby at `handle`. Fields stay empty until the first
    /// snapshot arrives.
    pub fn new(handle: StoreRef) -> Self {
        Self::open(handle, None)
    }

    /// Mirror the lobby at `handle`, seeding fields from a snapshot that was
    /// already delivered (e.g. by a child-added notification).
    pub fn with_snapshot(handle: StoreRef, snapshot: &Snapshot) -> Self {
        Self::open(handle, Some(snapshot))
    }

    fn open(handle: StoreRef, initial: Option<&Snapshot>) -> Self {
        let inner = Arc::new(LobbyInner {
            key: handle.key().to_string(),
            handle,
            data: RwLock::new(LobbyData::default()),
            events: EventEmitter::new(),
            watch: RwLock::new(None),
        });

        if let Some(snapshot) = initial {
            inner.apply_snapshot(snapshot);
        }

        let weak: Weak<LobbyInner> = Arc::downgrade(&inner);
        let id = inner.handle.watch(WatchKind::Value, move |snapshot| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_snapshot(snapshot);
            }
        });
        *lock_write(&inner.watch) = Some(id);

        Self { inner }
    }

    // =========================================================================
    // FIELDS
    // =========================================================================

    /// Store-assigned identifier.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Display name.
    pub fn name(&self) -> String {
        lock_read(&self.inner.data).name.clone()
    }

    /// Owning player's key.
    pub fn owner(&self) -> String {
        lock_read(&self.inner.data).owner.clone()
    }

    /// Selected map.
    pub fn map(&self) -> String {
        lock_read(&self.inner.data).map.clone()
    }

    /// Selected game type.
    pub fn game_type(&self) -> String {
        lock_read(&self.inner.data).game_type.clone()
    }

    /// Roster as of the last snapshot.
    pub fn players(&self) -> BTreeMap<String, LobbyPlayer> {
        lock_read(&self.inner.data).players.clone()
    }

    /// Number of players on the roster.
    pub fn player_count(&self) -> usize {
        lock_read(&self.inner.data).players.len()
    }

    /// Whether the owner is on the roster (true while the roster is empty).
    pub fn owner_is_member(&self) -> bool {
        lock_read(&self.inner.data).owner_is_member()
    }

    /// Copy of every cached field.
    pub fn snapshot(&self) -> LobbyData {
        lock_read(&self.inner.data).clone()
    }

    /// Store location of this lobby.
    pub fn handle(&self) -> &StoreRef {
        &self.inner.handle
    }

    /// Rename the lobby (3-32 characters).
    pub fn set_name(&self, name: &str) -> Result<(), ValidationError> {
        validate_lobby_name(fields::NAME, name)?;
        self.stage(fields::NAME, name, |data| data.name = name.to_string());
        Ok(())
    }

    /// Hand ownership to another player.
    pub fn set_owner(&self, owner_key: &str) -> Result<(), ValidationError> {
        require_non_empty(fields::OWNER, owner_key)?;
        self.stage(fields::OWNER, owner_key, |data| data.owner = owner_key.to_string());
        Ok(())
    }

    /// Select a map.
    pub fn set_map(&self, map: &str) -> Result<(), ValidationError> {
        require_non_empty(fields::MAP, map)?;
        self.stage(fields::MAP, map, |data| data.map = map.to_string());
        Ok(())
    }

    /// Select a game type.
    pub fn set_game_type(&self, game_type: &str) -> Result<(), ValidationError> {
        require_non_empty(fields::GAME_TYPE, game_type)?;
        self.stage(fields::GAME_TYPE, game_type, |data| {
            data.game_type = game_type.to_string()
        });
        Ok(())
    }

    /// Optimistic local write followed by the remote update.
    fn stage(&self, field: &str, value: &str, apply: impl FnOnce(&mut LobbyData)) {
        apply(&mut lock_write(&self.inner.data));
        self.inner.handle.update_field(field, value);
    }

    // =========================================================================
    // ROSTER
    // =========================================================================

    fn player_ref(&self, player_key: &str) -> Result<StoreRef, ValidationError> {
        validate_key("player.key", player_key)?;
        Ok(self.inner.handle.child(fields::PLAYERS).child(player_key))
    }

    /// Put `player` on the remote roster with a random skin.
    pub fn add_player(&self, player: &PlayerRef) -> Result<(), ValidationError> {
        validate_key("player.key", &player.key)?;
        match serde_json::to_value(LobbyPlayer::new(player.name.as_str(), RANDOM_SKIN)) {
            Ok(entry) => self
                .inner
                .handle
                .child(fields::PLAYERS)
                .update_field(&player.key, entry),
            Err(err) => error!(lobby = %self.inner.key, player = %player.key, %err, "failed to encode roster entry"),
        }
        Ok(())
    }

    /// Have the store drop the player's roster entry if this client's
    /// connection is lost.
    pub fn remove_player_on_disconnect(&self, player_key: &str) -> Result<(), ValidationError> {
        self.player_ref(player_key)?.on_disconnect().remove();
        Ok(())
    }

    /// Remove the player's roster entry now.
    pub fn remove_player(&self, player_key: &str) -> Result<(), ValidationError> {
        self.player_ref(player_key)?.remove();
        Ok(())
    }

    /// Set a player's skin. Any value is accepted here; the roster is only
    /// enforced when a session is bootstrapped.
    pub fn set_player_champion(&self, player_key: &str, champion: &str) -> Result<(), ValidationError> {
        self.player_ref(player_key)?.update_field(fields::SKIN, champion);
        Ok(())
    }

    /// Add `player` and register removal on disconnect.
    pub fn join(&self, player: &PlayerRef) -> Result<(), ValidationError> {
        self.add_player(player)?;
        self.remove_player_on_disconnect(&player.key)?;
        info!(lobby = %self.key(), player = %player.key, "joined lobby");
        Ok(())
    }

    /// Withdraw the disconnect hook and remove the player.
    pub fn leave(&self, player_key: &str) -> Result<(), ValidationError> {
        let entry = self.player_ref(player_key)?;
        entry.on_disconnect().cancel();
        entry.remove();
        info!(lobby = %self.key(), player = %player_key, "left lobby");
        Ok(())
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    /// Register a listener. The same closure may be registered repeatedly.
    pub fn on<F>(&self, kind: LobbyEvent, callback: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, callback)
    }

    /// Remove one registration; `None` if it was not registered.
    pub fn off(&self, kind: LobbyEvent, id: ListenerId) -> Option<ListenerId> {
        self.inner.events.off(kind, id)
    }

    /// Remove every listener. Notifications still in flight reach nobody.
    pub fn off_all_listeners(&self) {
        self.inner.events.off_all();
    }

    /// End the subscription and drop all listeners.
    pub fn close(&self) {
        self.inner.release();
        self.inner.events.off_all();
    }

    /// Whether the subscription has been released.
    pub fn is_closed(&self) -> bool {
        lock_read(&self.inner.watch).is_none()
    }
}

impl fmt::Debug for Lobby {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lobby")
            .field("key", &self.inner.key)
            .field("data", &*lock_read(&self.inner.data))
            .finish()
    }
}
