//! Session Bootstrap
//!
//! Turns a lobby's final roster into a session document and writes it under
//! the sessions root. Re-running with the same id replaces the previous
//! document wholesale.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, instrument};

use super::document::{SessionDocument, SessionPlayerRecord};
use super::roster::coerce_skin;
use crate::config::ClientConfig;
use crate::lobby::{Lobby, LobbyPlayer};
use crate::store::{RemoteStore, StoreRef};
use crate::validation::{require_non_empty, validate_key, ValidationError};

/// Writes session documents.
#[derive(Clone, Debug)]
pub struct SessionBootstrapper {
    sessions_root: StoreRef,
    session_duration: Duration,
}

impl SessionBootstrapper {
    /// Write under the sessions root configured in `config`.
    pub fn new(store: Arc<dyn RemoteStore>, config: &ClientConfig) -> Self {
        Self {
            sessions_root: StoreRef::new(store, config.sessions_root.as_str()),
            session_duration: config.session_duration,
        }
    }

    /// Bootstrap a session starting now.
    pub fn create(
        &self,
        id: &str,
        name: &str,
        players: &BTreeMap<String, LobbyPlayer>,
        map: &str,
        game_type: &str,
    ) -> Result<SessionDocument, ValidationError> {
        self.create_at(id, name, players, map, game_type, Utc::now())
    }

    /// Bootstrap a session starting at `start`.
    #[instrument(skip(self, players), fields(players = players.len()))]
    pub fn create_at(
        &self,
        id: &str,
        name: &str,
        players: &BTreeMap<String, LobbyPlayer>,
        map: &str,
        game_type: &str,
        start: DateTime<Utc>,
    ) -> Result<SessionDocument, ValidationError> {
        validate_key("id", id)?;
        require_non_empty("name", name)?;
        if players.is_empty() {
            return Err(ValidationError::Empty { field: "players" });
        }
        require_non_empty("map", map)?;
        require_non_empty("game_type", game_type)?;
        let end = start
            .checked_add_signed(self.session_duration)
            .ok_or(ValidationError::OutOfRange { field: "start" })?;

        let document = SessionDocument {
            name: name.to_string(),
            map: map.to_string(),
            game_type: game_type.to_string(),
            players: players
                .iter()
                .map(|(key, player)| {
                    let record = SessionPlayerRecord::spawn(&player.name, coerce_skin(&player.skin));
                    (key.clone(), record)
                })
                .collect(),
            start_timestamp: start.timestamp_millis(),
            end_timestamp: end.timestamp_millis(),
        };

        match serde_json::to_value(&document) {
            Ok(value) => {
                self.sessions_root.update_field(id, value);
                info!(session = %id, players = document.players.len(), "session created");
            }
            Err(err) => error!(session = %id, %err, "failed to encode session document"),
        }

        Ok(document)
    }

    /// Bootstrap from a lobby's cached fields, keyed by the lobby's key.
    pub fn bootstrap_lobby(&self, lobby: &Lobby) -> Result<SessionDocument, ValidationError> {
        let data = lobby.snapshot();
        self.create(lobby.key(), &data.name, &data.players, &data.map, &data.game_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::PlayerRef;
    use crate::session::document::Point;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn roster(entries: &[(&str, &str, &str)]) -> BTreeMap<String, LobbyPlayer> {
        entries
            .iter()
            .map(|(key, name, skin)| (key.to_string(), LobbyPlayer::new(*name, *skin)))
            .collect()
    }

    fn setup() -> (MemoryStore, SessionBootstrapper) {
        let store = MemoryStore::new();
        let bootstrapper = SessionBootstrapper::new(store.connect(), &ClientConfig::default());
        (store, bootstrapper)
    }

    #[test]
    fn test_unknown_skin_coerced_and_defaults_applied() {
        let (store, bootstrapper) = setup();
        let players = roster(&[("p1", "A", "unknown")]);

        let document = bootstrapper
            .create("g1", "Arena", &players, "de_dust", "ffa")
            .unwrap();

        let p1 = &document.players["p1"];
        assert_eq!(p1.skin, "kamil");
        assert_eq!(p1.hp, 100);
        assert_eq!(p1.position, Point { x: 32, y: 32 });
        assert!(!p1.online);

        let stored = store.value_at("games/g1").unwrap();
        assert_eq!(stored["players"]["p1"]["skin"], "kamil");
        assert_eq!(stored["players"]["p1"]["position"], json!({"x": 32, "y": 32}));
        assert_eq!(stored["gameType"], "ffa");
    }

    #[test]
    fn test_roster_skins_preserved() {
        let (_store, bootstrapper) = setup();
        let players = roster(&[("p1", "A", "ninja"), ("p2", "B", "rambo"), ("p3", "C", "random")]);

        let document = bootstrapper
            .create("g1", "Arena", &players, "de_dust", "ffa")
            .unwrap();

        assert_eq!(document.players["p1"].skin, "ninja");
        assert_eq!(document.players["p2"].skin, "rambo");
        assert_eq!(document.players["p3"].skin, "kamil");
    }

    #[test]
    fn test_end_is_five_minutes_after_start() {
        let (_store, bootstrapper) = setup();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let document = bootstrapper
            .create_at("g1", "Arena", &roster(&[("p1", "A", "kamil")]), "de_dust", "ffa", start)
            .unwrap();

        assert_eq!(document.start_timestamp, start.timestamp_millis());
        assert_eq!(document.end_timestamp - document.start_timestamp, 5 * 60 * 1000);
    }

    #[test]
    fn test_duration_from_config() {
        let store = MemoryStore::new();
        let config = ClientConfig {
            session_duration: Duration::minutes(10),
            sessions_root: "staging/games".into(),
            ..Default::default()
        };
        let bootstrapper = SessionBootstrapper::new(store.connect(), &config);

        let document = bootstrapper
            .create("g1", "Arena", &roster(&[("p1", "A", "kamil")]), "de_dust", "ffa")
            .unwrap();

        assert_eq!(document.end_timestamp - document.start_timestamp, 10 * 60 * 1000);
        assert!(store.value_at("staging/games/g1").is_some());
    }

    #[test]
    fn test_repeat_overwrites_wholesale() {
        let (store, bootstrapper) = setup();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let players = roster(&[("p1", "A", "ninja"), ("p2", "B", "kamil")]);

        bootstrapper
            .create_at("g1", "Arena", &players, "de_dust", "ffa", start)
            .unwrap();
        let once = store.value_at("games");

        bootstrapper
            .create_at("g1", "Arena", &players, "de_dust", "ffa", start)
            .unwrap();
        assert_eq!(store.value_at("games"), once);

        // A smaller roster replaces, not merges
        bootstrapper
            .create_at("g1", "Arena", &roster(&[("p2", "B", "kamil")]), "de_dust", "ffa", start)
            .unwrap();
        let players = store.value_at("games/g1/players").unwrap();
        assert!(players.get("p1").is_none());
    }

    #[test]
    fn test_validation_names_parameter() {
        let (store, bootstrapper) = setup();
        let players = roster(&[("p1", "A", "kamil")]);
        let none = BTreeMap::new();

        let cases = [
            (bootstrapper.create("", "Arena", &players, "de_dust", "ffa"), "id"),
            (bootstrapper.create("g1", "", &players, "de_dust", "ffa"), "name"),
            (bootstrapper.create("g1", "Arena", &none, "de_dust", "ffa"), "players"),
            (bootstrapper.create("g1", "Arena", &players, "", "ffa"), "map"),
            (bootstrapper.create("g1", "Arena", &players, "de_dust", ""), "game_type"),
        ];

        for (result, field) in cases {
            assert_eq!(result.unwrap_err().field(), field);
        }
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_start_too_late_for_duration_rejected() {
        let (store, bootstrapper) = setup();
        let players = roster(&[("p1", "A", "kamil")]);

        let result =
            bootstrapper.create_at("g1", "Arena", &players, "de_dust", "ffa", DateTime::<Utc>::MAX_UTC);

        assert_eq!(result, Err(ValidationError::OutOfRange { field: "start" }));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_bootstrap_from_synced_lobby() {
        let store = MemoryStore::new();
        let conn = store.connect();
        let config = ClientConfig::default();
        let lobbies = crate::lobby::LobbyCollection::new(conn.clone(), &config);

        let handle = lobbies.create_lobby("Arena", "u1").unwrap();
        store.flush();
        let lobby = lobbies.get(handle.key()).unwrap();
        lobby.join(&PlayerRef::new("u1", "Foo")).unwrap();
        lobby.set_player_champion("u1", "rambo").unwrap();
        store.flush();

        let document = SessionBootstrapper::new(conn, &config)
            .bootstrap_lobby(&lobby)
            .unwrap();

        assert_eq!(document.name, "Arena");
        assert_eq!(document.players["u1"].skin, "rambo");
        let path = format!("games/{}/name", handle.key());
        assert_eq!(store.value_at(&path), Some(json!("Arena")));
    }
}
