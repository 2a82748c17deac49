//! Bounded-retry decorator for a document store
//!
//! Wraps any store and retries transient failures (`Backend`, `Unavailable`) a fixed number
//! of times with a fixed pause. `NotFound`, `Malformed` and `InvalidPath` are returned
//! immediately. With `max_attempts = 1` this is a pass-through.

use super::{Document, DocumentStore, Filter, OrderBy};
use crate::error::StoreError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

fn is_transient(err: &StoreError) -> bool {
    matches!(err, StoreError::Backend(_) | StoreError::Unavailable(_))
}

pub struct RetryingStore {
    inner: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < self.policy.max_attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        op, attempt, self.policy.max_attempts, err
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl DocumentStore for RetryingStore {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    async fn get(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.run("get", || self.inner.get(collection, filter)).await
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.run("get_by_id", || self.inner.get_by_id(collection, id))
            .await
    }

    async fn get_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        self.run("get_all", || self.inner.get_all(collection, order))
            .await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.run("set", || self.inner.set(collection, id, document.clone()))
            .await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.run("update", || self.inner.update(collection, id, fields.clone()))
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.run("delete", || self.inner.delete(collection, id)).await
    }
}
