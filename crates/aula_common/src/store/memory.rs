//! In-memory document store

use super::{merge_fields, sort_documents, Document, DocumentStore, Filter, OrderBy};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Document store held entirely in memory.
///
/// `set_offline(true)` makes every write fail with `StoreError::Unavailable`, simulating the
/// hosted service being unreachable.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.values().find(|d| filter.matches(d)).cloned()))
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|docs| docs.get(id).cloned()))
    }

    async fn get_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        let mut docs: Vec<Document> = guard
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        if let Some(order) = order {
            sort_documents(&mut docs, order);
        }
        Ok(docs)
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.check_online()?;
        debug!("memory set {}/{}", collection, id);
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.check_online()?;
        debug!("memory update {}/{} ({} fields)", collection, id, fields.len());
        let mut guard = self.collections.write().await;
        let existing = guard
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_fields(existing, fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_online()?;
        if let Some(docs) = self.collections.write().await.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get_by_filter() {
        let store = MemoryStore::new();
        store
            .set("users", "r1", doc(json!({"registrationNumber": "r1", "name": "Ana"})))
            .await
            .unwrap();

        let found = store
            .get("users", &Filter::eq("registrationNumber", "r1"))
            .await
            .unwrap();
        assert_eq!(found.unwrap()["name"], "Ana");

        let missing = store
            .get("users", &Filter::eq("registrationNumber", "nope"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("users", "ghost", doc(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_offline_rejects_writes_but_allows_reads() {
        let store = MemoryStore::new();
        store.set("lessons", "l1", doc(json!({"id": "l1"}))).await.unwrap();
        store.set_offline(true);

        let err = store.set("lessons", "l2", doc(json!({"id": "l2"}))).await;
        assert!(matches!(err, Err(StoreError::Unavailable(_))));
        assert!(store.get_by_id("lessons", "l1").await.unwrap().is_some());
        assert_eq!(store.len("lessons").await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = MemoryStore::new();
        store.delete("books", "none").await.unwrap();
    }
}
