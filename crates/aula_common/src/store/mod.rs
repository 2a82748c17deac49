//! Document store abstraction
//!
//! The portal keeps all durable state in a schemaless document database. Everything above
//! this module talks to it through [`DocumentStore`]:
//!
//! - `get` returns the first document (by id order) matching a filter, or `None`
//! - `get_all` returns a whole collection, optionally ordered by one field
//! - `set` replaces a document, `update` shallow-merges fields into an existing one
//! - `delete` removes a document; deleting a missing id is not an error
//!
//! Backends: [`MemoryStore`] for tests and throwaway runs, [`SqliteStore`] standing in for the
//! hosted database, and [`RetryingStore`] as an optional bounded-retry decorator.

pub mod memory;
pub mod retry;
pub mod sqlite;

pub use memory::MemoryStore;
pub use retry::{RetryPolicy, RetryingStore};
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::warn;

/// A schemaless field/value map
pub type Document = serde_json::Map<String, Value>;

/// Collection names used by the portal
pub mod collections {
    pub const USERS: &str = "users";
    pub const SUBJECTS: &str = "subjects";
    pub const LESSONS: &str = "lessons";
    pub const BOOKS: &str = "books";
    pub const EXERCISES: &str = "exercises";

    pub const ALL: &[&str] = &[USERS, SUBJECTS, LESSONS, BOOKS, EXERCISES];
}

/// Equality filter on a single top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// Sort order for `get_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable backend name for logs
    fn backend(&self) -> &'static str;

    async fn get(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError>;

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn get_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError>;

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Sort documents in place by one field.
///
/// Numbers compare numerically, strings lexically. Documents missing the field (or holding
/// null) go last in both directions. The sort is stable, so ties keep id order.
pub fn sort_documents(documents: &mut [Document], order: &OrderBy) {
    documents.sort_by(|a, b| {
        let left = a.get(&order.field).filter(|v| !v.is_null());
        let right = b.get(&order.field).filter(|v| !v.is_null());
        match (left, right) {
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y);
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Serialize a typed value into a document (must serialize to a JSON object)
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Decode every document, skipping (and logging) the ones that do not fit `T`
pub fn decode_all<T: DeserializeOwned>(collection: &str, documents: Vec<Document>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|doc| match from_document(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("skipping malformed document in {}: {}", collection, e);
                None
            }
        })
        .collect()
}

/// Shallow merge: every field in `fields` replaces the field of the same name
pub(crate) fn merge_fields(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}
