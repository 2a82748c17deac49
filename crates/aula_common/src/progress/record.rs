//! Per-level result record

use super::key::LevelKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Score stored for a level that is unlocked but has never been played
pub const UNPLAYED_SCORE: i32 = -1;

/// A user's progress across every subject, keyed by `(subject, level)`
pub type ProgressMap = BTreeMap<LevelKey, LevelRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    /// Best percentage achieved (0-100), or -1 when unplayed
    pub score: i32,
    /// Stars for `score` (0-3)
    pub stars: u8,
    pub unlocked: bool,
    /// Empty string on the wire when unplayed
    #[serde(
        default,
        serialize_with = "serialize_completed_at",
        deserialize_with = "deserialize_completed_at"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LevelRecord {
    /// Unlocked, never played
    pub fn unlocked_unplayed() -> Self {
        Self {
            score: UNPLAYED_SCORE,
            stars: 0,
            unlocked: true,
            completed_at: None,
        }
    }

    pub fn played(score: u32, stars: u8, completed_at: DateTime<Utc>) -> Self {
        Self {
            score: score.min(100) as i32,
            stars,
            unlocked: true,
            completed_at: Some(completed_at),
        }
    }

    pub fn is_played(&self) -> bool {
        self.score >= 0
    }

    /// Best played score, with unplayed counting as zero
    pub fn best_score(&self) -> u32 {
        self.score.max(0) as u32
    }
}

fn serialize_completed_at<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(at) => serializer.serialize_str(&at.to_rfc3339()),
        None => serializer.serialize_str(""),
    }
}

fn deserialize_completed_at<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_unplayed_wire_shape() {
        let value = serde_json::to_value(LevelRecord::unlocked_unplayed()).unwrap();
        assert_eq!(
            value,
            json!({"score": -1, "stars": 0, "unlocked": true, "completedAt": ""})
        );
    }

    #[test]
    fn test_played_wire_shape() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let record = LevelRecord::played(80, 2, at);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["completedAt"], "2026-03-14T09:30:00+00:00");

        let back: LevelRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_missing_or_null_completed_at() {
        let a: LevelRecord =
            serde_json::from_value(json!({"score": 40, "stars": 0, "unlocked": true})).unwrap();
        assert_eq!(a.completed_at, None);
        let b: LevelRecord = serde_json::from_value(
            json!({"score": 40, "stars": 0, "unlocked": true, "completedAt": null}),
        )
        .unwrap();
        assert_eq!(b.completed_at, None);
    }

    #[test]
    fn test_best_score_treats_unplayed_as_zero() {
        assert_eq!(LevelRecord::unlocked_unplayed().best_score(), 0);
        assert!(!LevelRecord::unlocked_unplayed().is_played());
        assert_eq!(LevelRecord::played(150, 3, Utc::now()).score, 100);
    }
}
