use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a lesson in the curriculum, starting at zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonIndex(u32);

impl LessonIndex {
    /// Creates a new `LessonIndex`
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying u32 value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The lesson immediately after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Identifier of a signed-in or guest identity.
///
/// Server-assigned for real accounts, locally generated for guests.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new `UserId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for LessonIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonIndex({})", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for LessonIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for LessonIndex {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(LessonIndex::new)
            .map_err(|_| ParseIdError {
                kind: "LessonIndex",
            })
    }
}

impl FromStr for UserId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError { kind: "UserId" });
        }
        Ok(UserId::new(trimmed))
    }
}

impl From<u32> for LessonIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_index_display() {
        let id = LessonIndex::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_lesson_index_from_str() {
        let id: LessonIndex = " 7 ".parse().unwrap();
        assert_eq!(id, LessonIndex::new(7));
    }

    #[test]
    fn test_lesson_index_rejects_negative() {
        assert!("-1".parse::<LessonIndex>().is_err());
        assert!("abc".parse::<LessonIndex>().is_err());
    }

    #[test]
    fn test_lesson_index_serializes_as_plain_integer() {
        let json = serde_json::to_string(&vec![LessonIndex::new(0), LessonIndex::new(3)]).unwrap();
        assert_eq!(json, "[0,3]");
    }

    #[test]
    fn test_user_id_from_str_rejects_blank() {
        assert!("   ".parse::<UserId>().is_err());
        let id: UserId = "eu-west-1:abc".parse().unwrap();
        assert_eq!(id.as_str(), "eu-west-1:abc");
    }

    #[test]
    fn test_next_saturates() {
        assert_eq!(LessonIndex::new(u32::MAX).next(), LessonIndex::new(u32::MAX));
        assert_eq!(LessonIndex::new(4).next(), LessonIndex::new(5));
    }
}
