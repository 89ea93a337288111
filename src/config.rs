//! Client Configuration
//!
//! Store layout and lobby defaults, overridable from the environment.

use chrono::Duration;
use thiserror::Error;

/// Default store path holding lobby documents.
pub const DEFAULT_LOBBIES_ROOT: &str = "lobbies";

/// Default store path holding session documents.
pub const DEFAULT_SESSIONS_ROOT: &str = "games";

/// Map assigned to freshly created lobbies.
pub const DEFAULT_MAP: &str = "default";

/// Game type assigned to freshly created lobbies.
pub const DEFAULT_GAME_TYPE: &str = "default";

/// How long a bootstrapped session lasts (minutes).
pub const DEFAULT_SESSION_MINUTES: i64 = 5;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable is set but empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Variable could not be parsed.
    #[error("{var} has invalid value {value:?}")]
    Invalid {
        /// Environment variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Store path of the lobbies collection.
    pub lobbies_root: String,
    /// Store path of the sessions collection.
    pub sessions_root: String,
    /// Map for new lobbies.
    pub default_map: String,
    /// Game type for new lobbies.
    pub default_game_type: String,
    /// Session length written into `endTimestamp`.
    pub session_duration: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            lobbies_root: DEFAULT_LOBBIES_ROOT.to_string(),
            sessions_root: DEFAULT_SESSIONS_ROOT.to_string(),
            default_map: DEFAULT_MAP.to_string(),
            default_game_type: DEFAULT_GAME_TYPE.to_string(),
            session_duration: Duration::minutes(DEFAULT_SESSION_MINUTES),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let string = |var: &'static str, fallback: String| match lookup(var) {
            None => Ok(fallback),
            Some(value) if value.trim().is_empty() => Err(ConfigError::Empty(var)),
            Some(value) => Ok(value.trim().to_string()),
        };

        let session_duration = match lookup("ARENA_SESSION_MINUTES") {
            None => defaults.session_duration,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .and_then(Duration::try_minutes)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "ARENA_SESSION_MINUTES",
                    value: raw,
                })?,
        };

        Ok(Self {
            lobbies_root: string("ARENA_LOBBIES_ROOT", defaults.lobbies_root)?,
            sessions_root: string("ARENA_SESSIONS_ROOT", defaults.sessions_root)?,
            default_map: string("ARENA_DEFAULT_MAP", defaults.default_map)?,
            default_game_type: string("ARENA_DEFAULT_GAME_TYPE", defaults.default_game_type)?,
            session_duration,
        })
    }
}
