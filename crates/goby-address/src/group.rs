use std::fmt;
use std::sync::Arc;

/// Numeric tag meaning "no numeric tag was assigned".
pub const INVALID_NUMERIC: u8 = 255;
/// Numeric tag reserved for broadcast.
pub const BROADCAST_NUMERIC: u8 = 0;

/// Addressing label for a pub/sub channel.
///
/// A `Group` carries an optional string component and an optional 8-bit
/// numeric tag. String groups are mandatory on interprocess and inner
/// layers; numeric groups are mandatory on intervehicle. Two groups compare
/// equal iff both components match.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Group {
    name: Option<Arc<str>>,
    numeric: u8,
}

impl Group {
    /// Construct a group from a string with no numeric tag.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: Some(name.into()), numeric: INVALID_NUMERIC }
    }

    /// Construct a group with both a string and a numeric tag.
    pub fn with_numeric(name: impl Into<Arc<str>>, numeric: u8) -> Self {
        Self { name: Some(name.into()), numeric }
    }

    /// Construct a group with only a numeric tag (no string component).
    pub fn numeric_only(numeric: u8) -> Self {
        Self { name: None, numeric }
    }

    /// The broadcast group: numeric tag 0, no string.
    pub fn broadcast() -> Self {
        Self::numeric_only(BROADCAST_NUMERIC)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn numeric(&self) -> u8 {
        self.numeric
    }

    pub fn has_numeric(&self) -> bool {
        self.numeric != INVALID_NUMERIC
    }

    pub fn is_broadcast(&self) -> bool {
        self.numeric == BROADCAST_NUMERIC
    }

    /// Required by interprocess and inner layers: a non-empty string group.
    pub fn has_string(&self) -> bool {
        matches!(&self.name, Some(s) if !s.is_empty())
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(s) if self.numeric == INVALID_NUMERIC => write!(f, "{s}"),
            Some(s) => write!(f, "{s}::{}", self.numeric),
            None => write!(f, "{}", self.numeric),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_only_equality() {
        assert_eq!(Group::new("nav"), Group::new("nav"));
        assert_ne!(Group::new("nav"), Group::new("status"));
    }

    #[test]
    fn numeric_distinguishes_same_name() {
        assert_ne!(Group::with_numeric("status", 1), Group::with_numeric("status", 2));
        assert_eq!(Group::with_numeric("status", 1), Group::with_numeric("status", 1));
    }

    #[test]
    fn broadcast_is_numeric_zero() {
        assert!(Group::broadcast().is_broadcast());
        assert!(!Group::new("nav").is_broadcast());
    }

    #[test]
    fn display_matches_grammar() {
        assert_eq!(Group::new("nav").to_string(), "nav");
        assert_eq!(Group::with_numeric("status", 2).to_string(), "status::2");
        assert_eq!(Group::numeric_only(7).to_string(), "7");
    }
}
