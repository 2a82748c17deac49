//! Local-first updates against a store whose writes can be held back.
//!
//! Tests verify:
//! - Local state changes before the remote write completes
//! - Writes released out of order still leave the last submitted value locally
//! - A remote failure neither rolls back nor blocks later updates

use async_trait::async_trait;
use aula_common::error::StoreError;
use aula_common::progress::{LevelKey, LevelResult};
use aula_common::store::{Document, DocumentStore, Filter, MemoryStore, OrderBy};
use aula_common::sync::SyncController;
use aula_common::user::{User, UserDirectory, UserField};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;

const REG: &str = "2024-007";

/// Memory store whose `update` waits for a permit before writing
struct GatedStore {
    inner: MemoryStore,
    gate: Semaphore,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            gate: Semaphore::new(0),
        }
    }

    fn release(&self, writes: usize) {
        self.gate.add_permits(writes);
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    fn backend(&self) -> &'static str {
        "gated"
    }

    async fn get(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, filter).await
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get_by_id(collection, id).await
    }

    async fn get_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.get_all(collection, order).await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.inner.set(collection, id, document).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        permit.forget();
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }
}

async fn setup() -> (Arc<GatedStore>, SyncController) {
    let store = Arc::new(GatedStore::new());
    UserDirectory::new(store.clone())
        .register(&User::new(REG, "Iker"))
        .await
        .unwrap();
    let controller = SyncController::sign_in(store.clone(), REG)
        .await
        .unwrap()
        .unwrap();
    (store, controller)
}

async fn remote(store: &Arc<GatedStore>) -> User {
    UserDirectory::new(store.clone())
        .find(REG)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn local_state_leads_remote() {
    let (store, controller) = setup().await;

    controller.rename("Iker M.").unwrap();
    assert!(controller.toggle_lesson("intro"));

    assert_eq!(controller.user().name, "Iker M.");
    assert!(controller.user().has_completed("intro"));
    assert_eq!(controller.pending(), 2);

    let before = remote(&store).await;
    assert_eq!(before.name, "Iker");
    assert!(!before.has_completed("intro"));

    store.release(2);
    controller.flush().await;

    let after = remote(&store).await;
    assert_eq!(after.name, "Iker M.");
    assert!(after.has_completed("intro"));
    assert_eq!(controller.pending(), 0);
}

#[tokio::test]
async fn rapid_toggles_settle_on_last_local_value() {
    let (store, controller) = setup().await;

    for _ in 0..5 {
        controller.toggle_lesson("fractions");
    }
    assert!(controller.user().has_completed("fractions"));

    store.release(5);
    controller.flush().await;

    assert!(controller.user().has_completed("fractions"));
    assert!(controller.failures().is_empty());
}

#[tokio::test]
async fn progress_is_visible_before_it_lands() {
    let (store, controller) = setup().await;

    let result = LevelResult::new("history", 1, 70, Utc::now()).unwrap();
    let commit = controller.commit_level(&result, Some(5));
    assert!(commit.next_unlocked);

    let local = controller.user();
    assert!(local.exercise_progress[&LevelKey::new("history", 2)].unlocked);
    assert_eq!(local.xp(), 70);
    assert!(remote(&store).await.exercise_progress.is_empty());

    store.release(1);
    controller.flush().await;
    assert_eq!(remote(&store).await.xp(), 70);
}

#[tokio::test]
async fn failed_write_does_not_block_the_next() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    UserDirectory::new(Arc::clone(&store))
        .register(&User::new(REG, "Iker"))
        .await
        .unwrap();
    let controller = SyncController::sign_in(Arc::clone(&store), REG)
        .await
        .unwrap()
        .unwrap();

    // Wipe the remote user so the partial update has nothing to merge into
    store.delete(aula_common::store::collections::USERS, REG).await.unwrap();
    controller.set_color("orange").unwrap();
    controller.flush().await;

    let failures = controller.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].field, UserField::Color);
    assert_eq!(controller.user().color, "orange");

    controller.set_rank_visibility(false);
    controller.flush().await;
    assert_eq!(controller.failures().len(), 2);
    assert_eq!(controller.user().show_in_ranking, Some(false));
}
