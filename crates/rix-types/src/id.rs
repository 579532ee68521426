use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Unique identifier for a reading (UUID v7 when generated server-side).
///
/// Client-supplied identifiers may be any UUID version; they only have to
/// parse as a well-formed UUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(uuid::Uuid);

impl ReadingId {
    /// Generate a new time-ordered reading ID (UUID v7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Parse a textual identifier.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidId {
                id: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ReadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadingId({})", self.short_id())
    }
}

impl fmt::Display for ReadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = ReadingId::new();
        let b = ReadingId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_are_v7() {
        let id = ReadingId::new();
        assert_eq!(id.0.get_version_num(), 7);
    }

    #[test]
    fn parse_accepts_any_uuid_version() {
        let v4 = "f47ac10b-58cc-4372-a567-0e02b2c3d479";
        let id = ReadingId::parse(v4).unwrap();
        assert_eq!(id.to_string(), v4);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = ReadingId::parse("not-a-uuid").unwrap_err();
        assert!(matches!(err, TypeError::InvalidId { ref id, .. } if id == "not-a-uuid"));
    }

    #[test]
    fn display_roundtrips_through_parse() {
        let id = ReadingId::new();
        let parsed = ReadingId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn debug_uses_short_form() {
        let id = ReadingId::parse("f47ac10b-58cc-4372-a567-0e02b2c3d479").unwrap();
        assert_eq!(format!("{id:?}"), "ReadingId(f47ac10b)");
    }
}
