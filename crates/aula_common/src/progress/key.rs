//! Composite key for per-level progress records
//!
//! In memory the key is a `(subject_id, level)` pair. The string form
//! `{subject_id}_level_{level}` only exists at the document boundary, where the progress
//! map is stored as a JSON object.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SEPARATOR: &str = "_level_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelKey {
    pub subject_id: String,
    pub level: u32,
}

impl LevelKey {
    pub fn new(subject_id: impl Into<String>, level: u32) -> Self {
        Self {
            subject_id: subject_id.into(),
            level,
        }
    }

    pub fn next(&self) -> Self {
        Self::new(self.subject_id.clone(), self.level.saturating_add(1))
    }

    /// Key of the previous level, `None` for level 1 and below
    pub fn previous(&self) -> Option<Self> {
        if self.level <= 1 {
            return None;
        }
        Some(Self::new(self.subject_id.clone(), self.level - 1))
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.subject_id, SEPARATOR, self.level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid level key: {0:?}")]
pub struct ParseLevelKeyError(pub String);

impl FromStr for LevelKey {
    type Err = ParseLevelKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the last separator so subject ids may contain "_level_" themselves
        let (subject_id, level) = s
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| ParseLevelKeyError(s.to_string()))?;
        if subject_id.is_empty() {
            return Err(ParseLevelKeyError(s.to_string()));
        }
        let level = level
            .parse::<u32>()
            .map_err(|_| ParseLevelKeyError(s.to_string()))?;
        Ok(Self::new(subject_id, level))
    }
}

impl Serialize for LevelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LevelKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_wire_form() {
        let key = LevelKey::new("math", 3);
        assert_eq!(key.to_string(), "math_level_3");
        assert_eq!("math_level_3".parse::<LevelKey>().unwrap(), key);
    }

    #[test]
    fn test_subject_with_underscores() {
        let key = LevelKey::new("natural_science_level_a", 12);
        let parsed: LevelKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["math", "math_level_", "_level_2", "math_level_x", "math_level_-1"] {
            assert!(bad.parse::<LevelKey>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_neighbours() {
        let key = LevelKey::new("history", 1);
        assert_eq!(key.previous(), None);
        assert_eq!(key.next(), LevelKey::new("history", 2));
        assert_eq!(key.next().previous(), Some(key));
    }

    #[test]
    fn test_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(LevelKey::new("math", 2), 60);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"math_level_2":60}"#);

        let back: BTreeMap<LevelKey, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
