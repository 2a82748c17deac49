//! Portal - the stores and services one CLI invocation works with

use anyhow::{anyhow, Context, Result};
use aula_common::blob::LocalBlobStore;
use aula_common::config::StoreBackend;
use aula_common::store::{MemoryStore, RetryingStore, SqliteStore};
use aula_common::{AulaConfig, Catalog, DocumentStore, SyncController, UserDirectory};
use std::sync::Arc;
use tracing::debug;

pub struct Portal {
    pub config: AulaConfig,
    pub store: Arc<dyn DocumentStore>,
    pub catalog: Catalog,
    pub users: UserDirectory,
    pub blobs: LocalBlobStore,
}

impl Portal {
    /// Open the configured document store, wrapped in the configured retry policy
    pub async fn open(config: AulaConfig) -> Result<Self> {
        let backend: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => {
                let path = &config.store.sqlite_path;
                Arc::new(
                    SqliteStore::open(path)
                        .await
                        .with_context(|| format!("opening store at {}", path.display()))?,
                )
            }
        };
        debug!("document store backend: {}", backend.backend());

        let policy = config.sync.retry_policy();
        let store: Arc<dyn DocumentStore> = if policy.max_attempts > 1 {
            Arc::new(RetryingStore::new(backend, policy))
        } else {
            backend
        };

        Ok(Self {
            catalog: Catalog::new(Arc::clone(&store)),
            users: UserDirectory::new(Arc::clone(&store)),
            blobs: LocalBlobStore::new(config.blob.root.clone()),
            store,
            config,
        })
    }

    /// Sign in the student named by `--user`
    pub async fn sign_in(&self, registration: Option<&str>) -> Result<SyncController> {
        let registration = registration
            .ok_or_else(|| anyhow!("this command needs a student: pass --user <registration>"))?;
        SyncController::sign_in(Arc::clone(&self.store), registration)
            .await?
            .ok_or_else(|| anyhow!("no student with registration number {}", registration))
    }

    /// Wait for remote writes and count the ones that failed.
    ///
    /// Each failure was already logged by the write itself. Local changes stand either way.
    pub async fn settle(&self, controller: &SyncController) -> usize {
        controller.flush().await;
        let failed = controller.failures().len();
        debug!("{} remote write(s) failed", failed);
        failed
    }
}
