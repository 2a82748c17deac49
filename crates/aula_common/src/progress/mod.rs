//! Exercise progression
//!
//! Per-subject level tracks with star ratings and unlock rules.
//!
//! ## Records
//!
//! Each `(subject, level)` pair maps to a [`LevelRecord`] holding the best score, its stars,
//! whether the level is unlocked and when it was last improved.
//!
//! ## Rules
//!
//! - Pass threshold 50%: passing unlocks the next level
//! - Best score wins: a replay never lowers a stored score
//! - Experience grows by the amount a replay raises the best score

pub mod key;
pub mod record;
pub mod unlock;

pub use key::{LevelKey, ParseLevelKeyError};
pub use record::{LevelRecord, ProgressMap, UNPLAYED_SCORE};
pub use unlock::{
    commit_level_result, compute_stars, experience_gain, is_level_unlocked, level_overview,
    resolve_active_level, LevelResult, LevelStatus, PASS_THRESHOLD, STAR_THRESHOLDS,
};
