//! Champion Roster
//!
//! The closed set of skins a session accepts.

/// Permitted champions. The first entry is the fallback.
pub const ROSTER: [&str; 3] = ["kamil", "ninja", "rambo"];

/// Whether `skin` names a roster champion.
pub fn is_champion(skin: &str) -> bool {
    ROSTER.iter().any(|champion| *champion == skin)
}

/// `skin` if it is on the roster, otherwise the first champion.
pub fn coerce_skin(skin: &str) -> &str {
    if is_champion(skin) {
        skin
    } else {
        ROSTER[0]
    }
}
