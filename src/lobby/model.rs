//! Lobby Documents
//!
//! Shape of a lobby as stored under the lobbies root.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Skin written for a player who has not picked a champion yet.
pub const RANDOM_SKIN: &str = "random";

/// Store field names.
pub mod fields {
    /// Lobby display name.
    pub const NAME: &str = "name";
    /// Owning player's key.
    pub const OWNER: &str = "owner";
    /// Selected map.
    pub const MAP: &str = "map";
    /// Selected game type.
    pub const GAME_TYPE: &str = "gameType";
    /// Player roster node.
    pub const PLAYERS: &str = "players";
    /// A roster entry's skin.
    pub const SKIN: &str = "skin";
}

/// A user joining a lobby.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRef {
    /// User key, used as the roster key.
    pub key: String,
    /// Display name.
    pub name: String,
}

impl PlayerRef {
    /// Create a player reference.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// A roster entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Chosen champion, or [`RANDOM_SKIN`].
    #[serde(default)]
    pub skin: String,
}

impl LobbyPlayer {
    /// Create a roster entry.
    pub fn new(name: impl Into<String>, skin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skin: skin.into(),
        }
    }
}

/// Every field of a lobby document. Missing fields read as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyData {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning player's key.
    #[serde(default)]
    pub owner: String,
    /// Selected map.
    #[serde(default)]
    pub map: String,
    /// Selected game type.
    #[serde(default)]
    pub game_type: String,
    /// Roster keyed by player key.
    #[serde(default)]
    pub players: BTreeMap<String, LobbyPlayer>,
}

impl LobbyData {
    /// Read a stored lobby without rejecting it as a whole.
    ///
    /// Fields of the wrong type read as empty. Roster entries that do not
    /// decode are left out and their keys returned.
    pub fn from_stored(value: &Value) -> (Self, Vec<String>) {
        let text = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut rejected = Vec::new();
        let players: BTreeMap<String, LobbyPlayer> = value
            .get(fields::PLAYERS)
            .and_then(Value::as_object)
            .map(|roster| {
                roster
                    .iter()
                    .filter_map(|(key, entry)| match LobbyPlayer::deserialize(entry) {
                        Ok(player) => Some((key.clone(), player)),
                        Err(_) => {
                            rejected.push(key.clone());
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let data = Self {
            name: text(fields::NAME),
            owner: text(fields::OWNER),
            map: text(fields::MAP),
            game_type: text(fields::GAME_TYPE),
            players,
        };
        (data, rejected)
    }

    /// Whether the owner is on the roster (vacuously true while empty).
    pub fn owner_is_member(&self) -> bool {
        self.players.is_empty() || self.players.contains_key(&self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_stored_lobby() {
        let data: LobbyData = serde_json::from_value(json!({
            "name": "Arena",
            "owner": "u1",
            "map": "forest",
            "gameType": "ffa",
            "players": {"u1": {"name": "Foo", "skin": "random"}}
        }))
        .unwrap();

        assert_eq!(data.game_type, "ffa");
        assert_eq!(data.players["u1"], LobbyPlayer::new("Foo", RANDOM_SKIN));
        assert!(data.owner_is_member());
    }

    #[test]
    fn test_missing_fields_default() {
        let data: LobbyData = serde_json::from_value(json!({"name": "Arena"})).unwrap();
        assert_eq!(data.owner, "");
        assert!(data.players.is_empty());
    }

    #[test]
    fn test_stored_lobby_with_bad_values() {
        let (data, rejected) = LobbyData::from_stored(&json!({
            "name": 42,
            "map": "desert",
            "players": {
                "u1": {"name": "Foo"},
                "u9": {"skin": 7}
            }
        }));

        assert_eq!(data.name, "");
        assert_eq!(data.map, "desert");
        assert_eq!(data.players.len(), 1);
        assert_eq!(data.players["u1"], LobbyPlayer::new("Foo", ""));
        assert_eq!(rejected, vec!["u9".to_string()]);
    }

    #[test]
    fn test_stored_non_object_reads_empty() {
        let (data, rejected) = LobbyData::from_stored(&json!("Arena"));
        assert_eq!(data, LobbyData::default());
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_owner_membership() {
        let mut data = LobbyData {
            owner: "u1".into(),
            ..Default::default()
        };
        assert!(data.owner_is_member());

        data.players.insert("u2".into(), LobbyPlayer::new("Bar", RANDOM_SKIN));
        assert!(!data.owner_is_member());
    }
}
