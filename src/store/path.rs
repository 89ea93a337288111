//! Store Paths
//!
//! Slash-separated addresses into the document tree.

use std::fmt;

/// Normalized path into the store's document tree.
///
/// Empty segments are dropped, so `"/lobbies//abc/"` equals `"lobbies/abc"`.
/// The empty path addresses the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Append a relative (possibly multi-segment) path.
    pub fn join(&self, relative: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            relative
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        Self { segments }
    }

    /// Path segments from the root.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, or empty for the root.
    pub fn key(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Parent path; the root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if `self` equals `other` or lies above it.
    pub fn is_ancestor_or_self(&self, other: &StorePath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True if one path contains the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_ancestor_or_self(other) || other.is_ancestor_or_self(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl From<&str> for StorePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(StorePath::parse("/lobbies//abc/"), StorePath::parse("lobbies/abc"));
        assert!(StorePath::parse("/").is_root());
        assert_eq!(StorePath::parse("lobbies/abc").to_string(), "/lobbies/abc");
    }

    #[test]
    fn test_join_and_key() {
        let lobby = StorePath::parse("lobbies").join("abc");
        let player = lobby.join("players/u1");
        assert_eq!(player.key(), "u1");
        assert_eq!(player.parent().key(), "players");
        assert_eq!(StorePath::root().key(), "");
    }

    #[test]
    fn test_overlap() {
        let lobby = StorePath::parse("lobbies/abc");
        let player = StorePath::parse("lobbies/abc/players/u1");
        let other = StorePath::parse("lobbies/abd");

        assert!(lobby.is_ancestor_or_self(&player));
        assert!(!player.is_ancestor_or_self(&lobby));
        assert!(player.overlaps(&lobby));
        assert!(!other.overlaps(&lobby));
    }
}
