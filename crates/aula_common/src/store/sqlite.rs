// SQLite-backed document store
//
// Local stand-in for the hosted document database. One table holds every collection;
// bodies are JSON text. Single connection behind a mutex, all work on the blocking pool.

use super::{merge_fields, sort_documents, Document, DocumentStore, Filter, OrderBy};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database file at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path: PathBuf = path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!("Opening document store at: {}", db_path.display());

        let open_path = db_path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn = Connection::open(&open_path)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(conn)
        })
        .await??;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(db_path),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Open a private in-memory database
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn initialize_schema(&self) -> Result<(), StoreError> {
        self.execute(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS documents (
                    collection TEXT NOT NULL,
                    id TEXT NOT NULL,
                    body TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (collection, id)
                )",
                [],
            )?;
            Ok(())
        })
        .await?;
        debug!("Document store schema initialized");
        Ok(())
    }

    /// Run a closure against the connection on the blocking pool
    async fn execute<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await?
    }
}

fn load_collection(conn: &Connection, collection: &str) -> Result<Vec<Document>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY id ASC")?;
    let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

    let mut docs = Vec::new();
    for body in rows {
        docs.push(serde_json::from_str::<Document>(&body?)?);
    }
    Ok(docs)
}

fn load_one(conn: &Connection, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;
    match body {
        Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        None => Ok(None),
    }
}

fn store_one(
    conn: &Connection,
    collection: &str,
    id: &str,
    document: &Document,
) -> Result<(), StoreError> {
    let body = serde_json::to_string(document)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(collection, id) DO UPDATE SET
            body = excluded.body,
            updated_at = excluded.updated_at",
        params![collection, id, body, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.execute(move |conn| {
            Ok(load_collection(conn, &collection)?
                .into_iter()
                .find(|d| filter.matches(d)))
        })
        .await
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.execute(move |conn| load_one(conn, &collection, &id)).await
    }

    async fn get_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let collection = collection.to_string();
        let mut docs = self
            .execute(move |conn| load_collection(conn, &collection))
            .await?;
        if let Some(order) = order {
            sort_documents(&mut docs, order);
        }
        Ok(docs)
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        debug!("sqlite set {}/{}", collection, id);
        let collection = collection.to_string();
        let id = id.to_string();
        self.execute(move |conn| store_one(conn, &collection, &id, &document))
            .await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        debug!("sqlite update {}/{} ({} fields)", collection, id, fields.len());
        let collection = collection.to_string();
        let id = id.to_string();
        // Read-modify-write happens under the single connection lock
        self.execute(move |conn| {
            let mut existing =
                load_one(conn, &collection, &id)?.ok_or_else(|| StoreError::NotFound {
                    collection: collection.clone(),
                    id: id.clone(),
                })?;
            merge_fields(&mut existing, fields);
            store_one(conn, &collection, &id, &existing)
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
            Ok(())
        })
        .await
    }
}
