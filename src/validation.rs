//! Input Validation
//!
//! Synchronous checks applied to locally-supplied arguments before any
//! remote write is issued. A rejected call never touches the store.

use thiserror::Error;

/// Minimum lobby name length (characters).
pub const NAME_MIN_LEN: usize = 3;

/// Maximum lobby name length (characters).
pub const NAME_MAX_LEN: usize = 32;

/// Rejected local input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required string was empty.
    #[error("`{field}` must be a non-empty string")]
    Required {
        /// Offending parameter.
        field: &'static str,
    },

    /// A string's length is outside the permitted range.
    #[error("`{field}` must be {min}-{max} characters long, got {actual}")]
    OutOfBounds {
        /// Offending parameter.
        field: &'static str,
        /// Minimum accepted length.
        min: usize,
        /// Maximum accepted length.
        max: usize,
        /// Length supplied.
        actual: usize,
    },

    /// A mapping that must hold at least one entry was empty.
    #[error("`{field}` must be a non-empty mapping")]
    Empty {
        /// Offending parameter.
        field: &'static str,
    },

    /// A value falls outside what can be represented.
    #[error("`{field}` is out of range")]
    OutOfRange {
        /// Offending parameter.
        field: &'static str,
    },

    /// A key cannot be used as a single store path segment.
    #[error("`{field}` is not a valid key: {key:?}")]
    InvalidKey {
        /// Offending parameter.
        field: &'static str,
        /// The rejected key.
        key: String,
    },
}

impl ValidationError {
    /// Name of the parameter that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::OutOfBounds { field, .. }
            | Self::Empty { field }
            | Self::OutOfRange { field }
            | Self::InvalidKey { field, .. } => field,
        }
    }
}

/// Require a non-empty string.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Require a lobby name: non-empty and 3-32 characters.
///
/// Length counts Unicode scalar values, not bytes, so "Łódź" is four long.
pub fn validate_lobby_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    require_non_empty(field, name)?;

    let actual = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&actual) {
        return Err(ValidationError::OutOfBounds {
            field,
            min: NAME_MIN_LEN,
            max: NAME_MAX_LEN,
            actual,
        });
    }
    Ok(())
}

/// Require a key usable as one path segment (non-empty, no `/`).
pub fn validate_key(field: &'static str, key: &str) -> Result<(), ValidationError> {
    require_non_empty(field, key)?;

    if key.contains('/') {
        return Err(ValidationError::InvalidKey {
            field,
            key: key.to_string(),
        });
    }
    Ok(())
}
