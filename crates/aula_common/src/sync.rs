//! Optimistic sync controller
//!
//! Holds the signed-in user's state. Every change follows one discipline:
//!
//! 1. compute the new state from the current one
//! 2. make it visible locally, immediately
//! 3. spawn the remote write carrying the full new value of the changed fields
//! 4. on failure, log and record it; no rollback, no retry
//!
//! Local state therefore always reflects the latest mutation in submission order, while
//! remote writes may land in any order (each carries whole fields, so the last one to land
//! wins). `flush` waits for writes still in flight.

use crate::error::{StoreError, ValidationError};
use crate::progress::{commit_level_result, experience_gain, LevelRecord, LevelResult};
use crate::store::{collections, DocumentStore};
use crate::user::{User, UserDirectory, UserField};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A remote write that did not make it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub registration_number: String,
    pub field: UserField,
    pub error: String,
    pub at: DateTime<Utc>,
}

/// What a level commit changed locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCommit {
    pub result: LevelResult,
    /// Stored record for the level after the commit (the better of old and new)
    pub record: LevelRecord,
    pub improved: bool,
    pub xp_gained: u32,
    pub next_unlocked: bool,
}

pub struct SyncController {
    user: RwLock<User>,
    store: Arc<dyn DocumentStore>,
    pending: Mutex<JoinSet<()>>,
    failures: Arc<Mutex<Vec<SyncFailure>>>,
}

impl SyncController {
    pub fn new(user: User, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            user: RwLock::new(user),
            store,
            pending: Mutex::new(JoinSet::new()),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sign in by registration number; a miss is `Ok(None)`
    pub async fn sign_in(
        store: Arc<dyn DocumentStore>,
        registration_number: &str,
    ) -> Result<Option<Self>, StoreError> {
        let directory = UserDirectory::new(Arc::clone(&store));
        Ok(directory
            .login(registration_number)
            .await?
            .map(|user| Self::new(user, store)))
    }

    /// Snapshot of the local state
    pub fn user(&self) -> User {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Remote failures recorded so far
    pub fn failures(&self) -> Vec<SyncFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes still in flight
    pub fn pending(&self) -> usize {
        let mut tasks = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        reap_finished(&mut tasks);
        tasks.len()
    }

    /// Apply `mutation` locally, then fire `remote_write` with the new state.
    ///
    /// Returns the new local state.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`. The local change has
    /// already been applied at that point.
    pub fn apply_and_sync<M, W, Fut>(&self, field: UserField, mutation: M, remote_write: W) -> User
    where
        M: FnOnce(&User) -> User,
        W: FnOnce(User) -> Fut,
        Fut: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let updated = {
            let mut guard = self.user.write().unwrap_or_else(PoisonError::into_inner);
            let next = mutation(&*guard);
            *guard = next.clone();
            next
        };

        let write = remote_write(updated.clone());
        let failures = Arc::clone(&self.failures);
        let registration_number = updated.registration_number.clone();

        let mut tasks = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        reap_finished(&mut tasks);
        tasks.spawn(async move {
            match write.await {
                Ok(()) => debug!("synced {} for {}", field, registration_number),
                Err(e) => {
                    warn!("failed to sync {} for {}: {}", field, registration_number, e);
                    failures
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(SyncFailure {
                            registration_number,
                            field,
                            error: e.to_string(),
                            at: Utc::now(),
                        });
                }
            }
        });
        drop(tasks);

        updated
    }

    /// `apply_and_sync` with the standard remote write: a partial update of `field`
    fn apply_field<M>(&self, field: UserField, mutation: M) -> User
    where
        M: FnOnce(&User) -> User,
    {
        let store = Arc::clone(&self.store);
        self.apply_and_sync(field, mutation, move |user: User| async move {
            let fields = user.field_document(field)?;
            store
                .update(collections::USERS, &user.registration_number, fields)
                .await
        })
    }

    /// Mark a lesson done, or undone if it already was. Returns the new completion state.
    pub fn toggle_lesson(&self, lesson_id: &str) -> bool {
        let updated = self.apply_field(UserField::CompletedLessons, |user| {
            let mut next = user.clone();
            if !next.completed_lessons.remove(lesson_id) {
                next.completed_lessons.insert(lesson_id.to_string());
            }
            next
        });
        updated.has_completed(lesson_id)
    }

    /// Change the display name. Blank names are rejected and nothing is written.
    pub fn rename(&self, name: &str) -> Result<(), ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.apply_field(UserField::Name, |user| User {
            name: name.to_string(),
            ..user.clone()
        });
        Ok(())
    }

    pub fn set_color(&self, color: &str) -> Result<(), ValidationError> {
        let color = color.trim();
        if color.is_empty() {
            return Err(ValidationError::EmptyColor);
        }
        self.apply_field(UserField::Color, |user| User {
            color: color.to_string(),
            ..user.clone()
        });
        Ok(())
    }

    pub fn set_rank_visibility(&self, visible: bool) {
        self.apply_field(UserField::ShowInRanking, |user| User {
            show_in_ranking: Some(visible),
            ..user.clone()
        });
    }

    /// Merge a finished level into the progress map and add the experience it earned
    pub fn commit_level(&self, result: &LevelResult, max_level: Option<u32>) -> LevelCommit {
        let mut commit = None;

        self.apply_field(UserField::Progress, |user| {
            let key = result.key();
            let previous = user.exercise_progress.get(&key);
            let xp_gained = experience_gain(previous, result.percentage);
            let improved = previous.map_or(true, |r| r.score <= result.percentage as i32);
            let next_was_unlocked = user
                .exercise_progress
                .get(&key.next())
                .is_some_and(|r| r.unlocked);

            let progress = commit_level_result(&user.exercise_progress, result, max_level);
            let next_unlocked = !next_was_unlocked
                && progress.get(&key.next()).is_some_and(|r| r.unlocked);

            commit = progress.get(&key).cloned().map(|record| LevelCommit {
                result: result.clone(),
                record,
                improved,
                xp_gained,
                next_unlocked,
            });

            User {
                exercise_progress: progress,
                total_xp: Some(user.xp() + u64::from(xp_gained)),
                ..user.clone()
            }
        });

        // commit_level_result always leaves a record for the played level
        let commit = commit.unwrap_or_else(|| LevelCommit {
            result: result.clone(),
            record: LevelRecord::played(result.percentage, result.stars, result.completed_at),
            improved: true,
            xp_gained: 0,
            next_unlocked: false,
        });

        info!(
            "{} finished {} level {} with {}% ({} stars, +{} xp)",
            self.user().registration_number,
            result.subject_id,
            result.level,
            result.percentage,
            result.stars,
            commit.xp_gained
        );
        commit
    }

    /// Wait for every write still in flight
    pub async fn flush(&self) {
        loop {
            let mut tasks = std::mem::take(
                &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if tasks.is_empty() {
                return;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!("sync task did not complete: {}", e);
                }
            }
        }
    }
}

/// Drop tasks that already completed. Their outcome was handled inside the task.
fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(e) = joined {
            warn!("sync task did not complete: {}", e);
        }
    }
}
