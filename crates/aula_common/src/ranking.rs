//! Ranking of students by total experience
//!
//! Users who switched `showInRanking` off are left out. Ties share a position.

use crate::error::StoreError;
use crate::store::{collections, decode_all, DocumentStore, OrderBy};
use crate::user::{fields, User};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    /// 1-based, shared by equal totals
    pub position: usize,
    pub registration_number: String,
    pub name: String,
    pub color: String,
    pub total_xp: u64,
}

/// Rank already-ordered users (highest experience first)
pub fn rank_users(users: impl IntoIterator<Item = User>) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = Vec::new();
    for user in users.into_iter().filter(User::is_visible_in_ranking) {
        let xp = user.xp();
        let position = match entries.last() {
            Some(prev) if prev.total_xp == xp => prev.position,
            _ => entries.len() + 1,
        };
        entries.push(RankingEntry {
            position,
            registration_number: user.registration_number,
            name: user.name,
            color: user.color,
            total_xp: xp,
        });
    }
    entries
}

/// Fetch users ordered by experience and rank the visible ones
pub async fn load_ranking(
    store: &dyn DocumentStore,
    limit: Option<usize>,
) -> Result<Vec<RankingEntry>, StoreError> {
    let docs = store
        .get_all(collections::USERS, Some(&OrderBy::desc(fields::TOTAL_XP)))
        .await?;
    let mut entries = rank_users(decode_all::<User>(collections::USERS, docs));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    Ok(entries)
}
