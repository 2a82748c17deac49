//! Arena: a quiz session bound to one level of one subject
//!
//! Entering checks the level is unlocked and loads its pool. When the session finishes,
//! the outcome is committed through the sync controller exactly once.

use super::session::{AnswerFeedback, QuizSession, SessionState};
use crate::catalog::Catalog;
use crate::error::{AulaError, QuizError};
use crate::progress::{is_level_unlocked, LevelResult};
use crate::sync::{LevelCommit, SyncController};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct QuizArena {
    subject_id: String,
    level: u32,
    max_level: Option<u32>,
    reveal_delay: Duration,
    session: QuizSession,
}

impl QuizArena {
    pub async fn enter(
        catalog: &Catalog,
        controller: &SyncController,
        subject_id: &str,
        level: u32,
        question_count: usize,
        reveal_delay: Duration,
    ) -> Result<Self, AulaError> {
        let user = controller.user();
        if !is_level_unlocked(level, &user.exercise_progress, subject_id) {
            return Err(QuizError::LevelLocked {
                subject_id: subject_id.to_string(),
                level,
            }
            .into());
        }

        let pool = catalog.exercises(subject_id, level).await?;
        let max_level = catalog.max_level(subject_id).await?;
        let session = QuizSession::start(pool, question_count)?;
        debug!(
            "entered {} level {} with {} questions",
            subject_id,
            level,
            session.total()
        );

        Ok(Self {
            subject_id: subject_id.to_string(),
            level,
            max_level,
            reveal_delay,
            session,
        })
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn submit_answer(&mut self, option: usize) -> AnswerFeedback {
        self.session.submit_answer(option)
    }

    /// Move past the reveal pause. On the finishing transition the result is committed;
    /// later calls return `None`.
    pub fn advance(&mut self, controller: &SyncController) -> Option<LevelCommit> {
        if self.session.advance() != SessionState::Finished {
            return None;
        }
        let outcome = self.session.take_outcome()?;
        let result = match LevelResult::new(
            self.subject_id.clone(),
            self.level,
            outcome.percentage,
            Utc::now(),
        ) {
            Ok(result) => result,
            Err(e) => {
                warn!("discarding invalid quiz result: {}", e);
                return None;
            }
        };
        Some(controller.commit_level(&result, self.max_level))
    }

    /// Wait out the reveal pause, then advance
    pub async fn reveal_then_advance(&mut self, controller: &SyncController) -> Option<LevelCommit> {
        if !self.reveal_delay.is_zero() {
            tokio::time::sleep(self.reveal_delay).await;
        }
        self.advance(controller)
    }

    /// Start the same level again from scratch
    pub fn restart(&mut self) {
        self.session.restart();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Exercise;
    use crate::progress::LevelKey;
    use crate::store::{DocumentStore, MemoryStore};
    use crate::user::{User, UserDirectory};
    use std::sync::Arc;

    async fn setup() -> (Catalog, SyncController) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let catalog = Catalog::new(Arc::clone(&store));
        for (id, level) in [("a", 1), ("b", 1), ("c", 1), ("d", 2)] {
            catalog
                .put(&Exercise {
                    id: id.into(),
                    subject_id: "math".into(),
                    level,
                    prompt: format!("{}?", id),
                    options: vec!["yes".into(), "no".into()],
                    correct_option: 0,
                })
                .await
                .unwrap();
        }
        UserDirectory::new(Arc::clone(&store))
            .register(&User::new("r1", "Ana"))
            .await
            .unwrap();
        let controller = SyncController::sign_in(store, "r1").await.unwrap().unwrap();
        (catalog, controller)
    }

    #[tokio::test]
    async fn test_locked_level_cannot_be_entered() {
        let (catalog, controller) = setup().await;
        let err = QuizArena::enter(&catalog, &controller, "math", 2, 10, Duration::ZERO)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AulaError::Quiz(QuizError::LevelLocked { level: 2, .. })));
    }

    #[tokio::test]
    async fn test_finishing_commits_exactly_once() {
        let (catalog, controller) = setup().await;
        let mut arena = QuizArena::enter(&catalog, &controller, "math", 1, 10, Duration::ZERO)
            .await
            .unwrap();

        let mut commits = Vec::new();
        for i in 0..10 {
            arena.submit_answer(if i < 6 { 0 } else { 1 });
            if let Some(commit) = arena.reveal_then_advance(&controller).await {
                commits.push(commit);
            }
        }
        assert!(arena.advance(&controller).is_none());
        assert_eq!(commits.len(), 1);

        let commit = &commits[0];
        assert_eq!(commit.result.percentage, 60);
        assert_eq!(commit.record.stars, 1);

        let user = controller.user();
        let second = &user.exercise_progress[&LevelKey::new("math", 2)];
        assert_eq!((second.score, second.stars, second.unlocked), (-1, 0, true));
        assert_eq!(user.xp(), 60);

        // Level 2 is the last known level: nothing past it
        let mut arena = QuizArena::enter(&catalog, &controller, "math", 2, 2, Duration::ZERO)
            .await
            .unwrap();
        for _ in 0..2 {
            arena.submit_answer(0);
            arena.advance(&controller);
        }
        assert!(!controller
            .user()
            .exercise_progress
            .contains_key(&LevelKey::new("math", 3)));
    }

    #[tokio::test]
    async fn test_restart_allows_a_second_commit() {
        let (catalog, controller) = setup().await;
        let mut arena = QuizArena::enter(&catalog, &controller, "math", 1, 1, Duration::ZERO)
            .await
            .unwrap();
        arena.submit_answer(1);
        assert!(arena.advance(&controller).is_some());

        arena.restart();
        arena.submit_answer(0);
        let commit = arena.advance(&controller).unwrap();
        assert_eq!(commit.result.percentage, 100);
        assert_eq!(commit.xp_gained, 100);
    }
}
