//! Aula Common - core of the student learning portal
//!
//! Exercise progression, quiz sessions and optimistic profile sync on top of an external
//! document store. Everything a front-end needs except rendering.

pub mod blob;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod quiz;
pub mod ranking;
pub mod store;
pub mod sync;
pub mod user;

pub use catalog::{Book, Catalog, CatalogEntry, CatalogSeed, Exercise, Lesson, Subject};
pub use config::AulaConfig;
pub use error::{AulaError, ConfigError, QuizError, StoreError, ValidationError};
pub use progress::{LevelKey, LevelRecord, LevelResult, ProgressMap};
pub use quiz::{QuizArena, QuizSession};
pub use store::{Document, DocumentStore};
pub use sync::{LevelCommit, SyncController, SyncFailure};
pub use user::{User, UserDirectory, UserField};
