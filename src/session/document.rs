//! Session Documents
//!
//! The record written once when a lobby turns into a running game.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hit points every player starts with.
pub const START_HP: u32 = 100;

/// Spawn coordinate on both axes.
pub const SPAWN_COORD: i32 = 32;

/// A map position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Where players spawn and aim at first.
    pub const SPAWN: Point = Point {
        x: SPAWN_COORD,
        y: SPAWN_COORD,
    };
}

/// Per-player counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Opponents eliminated.
    pub kills: u32,
    /// Times eliminated.
    pub deaths: u32,
}

/// A player's initial in-game state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPlayerRecord {
    /// Display name.
    pub name: String,
    /// Roster champion.
    pub skin: String,
    /// Set by the game client once it connects.
    pub online: bool,
    /// Hit points.
    pub hp: u32,
    /// Respawn countdown.
    pub respawn: u32,
    /// Position on the map.
    pub position: Point,
    /// Aim point.
    pub cursor: Point,
    /// Kill/death counters.
    pub stats: PlayerStats,
}

impl SessionPlayerRecord {
    /// Fresh record at the spawn point.
    pub fn spawn(name: impl Into<String>, skin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skin: skin.into(),
            online: false,
            hp: START_HP,
            respawn: 0,
            position: Point::SPAWN,
            cursor: Point::SPAWN,
            stats: PlayerStats::default(),
        }
    }
}

/// A bootstrapped game session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    /// Session name, taken from the lobby.
    pub name: String,
    /// Map to load.
    pub map: String,
    /// Game type.
    pub game_type: String,
    /// Players keyed by player key.
    pub players: BTreeMap<String, SessionPlayerRecord>,
    /// Start instant, Unix milliseconds.
    pub start_timestamp: i64,
    /// End instant, Unix milliseconds.
    pub end_timestamp: i64,
}
