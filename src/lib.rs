//! # Arena Lobby
//!
//! Lobby and session synchronization for the arena matchmaking client.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ARENA LOBBY                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  store/          - Remote document store capability          │
//! │  ├── mod.rs      - RemoteStore trait, StoreRef handle        │
//! │  ├── path.rs     - Slash-separated store paths               │
//! │  ├── snapshot.rs - Subscription payloads                     │
//! │  └── memory.rs   - In-process store with queued delivery     │
//! │                                                              │
//! │  lobby/          - Synchronized lobby state                  │
//! │  ├── model.rs    - Stored lobby shape                        │
//! │  ├── events.rs   - Local listener registry                   │
//! │  ├── entity.rs   - One mirrored lobby                        │
//! │  └── collection.rs - Lobby discovery and creation            │
//! │                                                              │
//! │  session/        - Lobby → game session                      │
//! │  ├── roster.rs   - Champion roster                           │
//! │  ├── document.rs - Session document                          │
//! │  └── bootstrap.rs- Document creation                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model
//!
//! The store is the only arbiter of shared state:
//! - Setters write locally, then update the store; the echo fires `change`
//! - Roster and collection membership change only through store notifications
//! - Writes are fire-and-forget; no retries, no client-side locking
//! - Invalid local input is rejected before anything is written

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod lobby;
pub mod session;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError};
pub use lobby::{Lobby, LobbyCollection, LobbyEvent, LobbyPlayer, PlayerRef};
pub use session::{SessionBootstrapper, SessionDocument};
pub use store::{MemoryStore, RemoteStore, StoreRef};
pub use validation::ValidationError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
