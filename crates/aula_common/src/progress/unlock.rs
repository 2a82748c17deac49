//! Level Unlock Engine
//!
//! Pure functions over a user's progress map:
//!
//! - Level 1 of every subject is always playable
//! - Level N is playable if its own record is unlocked, or level N-1 scored >= 50
//! - Stars: >= 90 three, >= 70 two, >= 50 one, else none
//! - A stored score is never replaced by a lower one; passing always unlocks the next level
//!
//! Nothing here mutates its input. `commit_level_result` returns a new map.

use super::key::LevelKey;
use super::record::{LevelRecord, ProgressMap};
use crate::error::ValidationError;
use chrono::{DateTime, Utc};

/// Percentage at or above which a level counts as cleared
pub const PASS_THRESHOLD: i32 = 50;

/// Star thresholds, highest first
pub const STAR_THRESHOLDS: &[(u32, u8)] = &[(90, 3), (70, 2), (50, 1)];

pub fn compute_stars(percentage: u32) -> u8 {
    for &(min, stars) in STAR_THRESHOLDS {
        if percentage >= min {
            return stars;
        }
    }
    0
}

pub fn is_level_unlocked(level: u32, progress: &ProgressMap, subject_id: &str) -> bool {
    if level <= 1 {
        return true;
    }

    let key = LevelKey::new(subject_id, level);
    if progress.get(&key).is_some_and(|r| r.unlocked) {
        return true;
    }

    key.previous()
        .and_then(|prev| progress.get(&prev))
        .is_some_and(|r| r.score >= PASS_THRESHOLD)
}

/// Level the cursor should rest on.
///
/// The highest playable level, moved one step forward when that level is already cleared
/// and a later level exists. `levels` need not be sorted; an empty slice yields 1.
pub fn resolve_active_level(levels: &[u32], progress: &ProgressMap, subject_id: &str) -> u32 {
    let mut sorted: Vec<u32> = levels.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let Some(position) = sorted
        .iter()
        .rposition(|&level| is_level_unlocked(level, progress, subject_id))
    else {
        return sorted.first().copied().unwrap_or(1);
    };

    let active = sorted[position];
    let cleared = progress
        .get(&LevelKey::new(subject_id, active))
        .is_some_and(|r| r.score >= PASS_THRESHOLD);

    match sorted.get(position + 1) {
        Some(&next) if cleared => next,
        _ => active,
    }
}

/// Result of one finished quiz, ready to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelResult {
    pub subject_id: String,
    pub level: u32,
    pub percentage: u32,
    pub stars: u8,
    pub completed_at: DateTime<Utc>,
}

impl LevelResult {
    /// Build a result, deriving stars from the percentage
    pub fn new(
        subject_id: impl Into<String>,
        level: u32,
        percentage: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let subject_id = subject_id.into();
        if subject_id.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "subject_id" });
        }
        if level == 0 {
            return Err(ValidationError::InvalidLevel);
        }
        if percentage > 100 {
            return Err(ValidationError::InvalidPercentage(percentage));
        }
        Ok(Self {
            subject_id,
            level,
            percentage,
            stars: compute_stars(percentage),
            completed_at,
        })
    }

    pub fn key(&self) -> LevelKey {
        LevelKey::new(self.subject_id.clone(), self.level)
    }

    pub fn passed(&self) -> bool {
        self.percentage as i32 >= PASS_THRESHOLD
    }
}

/// Merge a finished level into the progress map.
///
/// When `max_level` is known, passing the last level does not create a record past it.
pub fn commit_level_result(
    progress: &ProgressMap,
    result: &LevelResult,
    max_level: Option<u32>,
) -> ProgressMap {
    let mut updated = progress.clone();
    let key = result.key();
    let next = key.next();
    let has_next = max_level.map_or(true, |max| result.level < max);
    let new_score = result.percentage as i32;

    let keeps_better = updated
        .get(&key)
        .is_some_and(|current| current.score > new_score);

    if keeps_better {
        if result.passed() && has_next {
            updated
                .entry(next)
                .or_insert_with(LevelRecord::unlocked_unplayed);
        }
        return updated;
    }

    updated.insert(
        key,
        LevelRecord::played(result.percentage, result.stars, result.completed_at),
    );

    if result.passed() && has_next {
        updated
            .entry(next)
            .and_modify(|r| r.unlocked = true)
            .or_insert_with(LevelRecord::unlocked_unplayed);
    }

    updated
}

/// Experience earned by a result: how far it raises the previous best score
pub fn experience_gain(previous: Option<&LevelRecord>, percentage: u32) -> u32 {
    let best = previous.map(LevelRecord::best_score).unwrap_or(0);
    percentage.saturating_sub(best)
}

/// One row of a subject's level map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStatus {
    pub level: u32,
    pub unlocked: bool,
    pub record: Option<LevelRecord>,
    pub is_active: bool,
}

pub fn level_overview(levels: &[u32], progress: &ProgressMap, subject_id: &str) -> Vec<LevelStatus> {
    let active = resolve_active_level(levels, progress, subject_id);
    let mut sorted: Vec<u32> = levels.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    sorted
        .into_iter()
        .map(|level| LevelStatus {
            level,
            unlocked: is_level_unlocked(level, progress, subject_id),
            record: progress.get(&LevelKey::new(subject_id, level)).cloned(),
            is_active: level == active,
        })
        .collect()
}
