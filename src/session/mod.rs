//! Session Bootstrap
//!
//! One-shot conversion of a lobby roster into a game session document.
//!
//! - `roster`: permitted champions and skin coercion
//! - `document`: session document types
//! - `bootstrap`: validation and the store write

pub mod bootstrap;
pub mod document;
pub mod roster;

pub use bootstrap::SessionBootstrapper;
pub use document::{PlayerStats, Point, SessionDocument, SessionPlayerRecord};
pub use roster::{coerce_skin, is_champion, ROSTER};
