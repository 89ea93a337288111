//! Lobby Layer
//!
//! Mirrors lobby documents between the remote store and local observers.
//!
//! ## Module Structure
//!
//! - `model`: stored lobby shape and player references
//! - `events`: local listener registry
//! - `entity`: a single synchronized lobby
//! - `collection`: discovery and creation of lobbies

pub mod collection;
pub mod entity;
pub mod events;
pub mod model;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Re-export key types
pub use collection::{CollectionEvent, CollectionEventKind, LobbyCollection};
pub use entity::{Lobby, LobbyEvent};
pub use events::{EventEmitter, ListenerId};
pub use model::{LobbyData, LobbyPlayer, PlayerRef, RANDOM_SKIN};

// Poisoned locks are recovered, not propagated.
fn lock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn lock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
