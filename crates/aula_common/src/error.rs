//! Error types for the portal core
//!
//! Lookup misses are not errors: store reads return `Ok(None)` when nothing matches.
//! Remote write failures during optimistic sync are logged and recorded, never returned
//! to the caller that made the local change.

use thiserror::Error;

/// Errors raised by a document or blob store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Backend(format!("blocking task failed: {}", err))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Input rejected before any state is touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("display name cannot be empty")]
    EmptyName,

    #[error("color tag cannot be empty")]
    EmptyColor,

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("exercise needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct option {index} is out of range for {count} options")]
    CorrectOptionOutOfRange { index: usize, count: usize },

    #[error("level must be at least 1")]
    InvalidLevel,

    #[error("percentage {0} is outside 0-100")]
    InvalidPercentage(u32),

    #[error("{subject_id} has no exercises for level {level}")]
    LevelGap { subject_id: String, level: u32 },
}

/// Errors starting a quiz session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("no exercises available for this level")]
    EmptyPool,

    #[error("a session needs at least one question")]
    NoQuestions,

    #[error("level {level} of {subject_id} is locked")]
    LevelLocked { subject_id: String, level: u32 },
}

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config: {0}")]
    Write(String),
}

/// Top-level error for callers that mix several subsystems
#[derive(Debug, Error)]
pub enum AulaError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = AulaError> = std::result::Result<T, E>;
