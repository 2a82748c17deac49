//! Aula configuration
//!
//! TOML file, every field optional. Lookup order:
//! 1. explicit path (`aulactl --config`)
//! 2. `$AULA_CONFIG`
//! 3. `$XDG_CONFIG_HOME/aula/config.toml`, else `~/.config/aula/config.toml`
//! 4. built-in defaults
//!
//! A file that exists but does not parse is an error; a missing file means defaults.

use crate::error::ConfigError;
use crate::store::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_ENV: &str = "AULA_CONFIG";

/// Which document store backs the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_sqlite_path() -> PathBuf {
    data_dir().join("aula.db")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobSettings {
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
}

fn default_blob_root() -> PathBuf {
    data_dir().join("blobs")
}

impl Default for BlobSettings {
    fn default() -> Self {
        Self {
            root: default_blob_root(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSettings {
    /// Questions per session (valid: 1-50)
    #[serde(default = "default_questions_per_session")]
    pub questions_per_session: usize,

    /// Pause after an answer before the next question, in milliseconds
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
}

fn default_questions_per_session() -> usize {
    10
}

fn default_reveal_delay_ms() -> u64 {
    1200
}

impl QuizSettings {
    pub fn effective_questions(&self) -> usize {
        self.questions_per_session.clamp(1, 50)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            questions_per_session: default_questions_per_session(),
            reveal_delay_ms: default_reveal_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Attempts per remote call, 1 = no retry (valid: 1-10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl SyncSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts.clamp(1, 10),
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// tracing filter directive, e.g. "info" or "aula_common=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AulaConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub blob: BlobSettings,

    #[serde(default)]
    pub quiz: QuizSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl AulaConfig {
    /// Load from the first location in the lookup order that exists
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| config_path().filter(|p| p.exists())),
        };

        match path {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Write(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::Write(e.to_string()))
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// User config file path, if a home or XDG directory is known
pub fn config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|h| h.join(".config")))?;
    Some(base.join("aula").join(CONFIG_FILE))
}

/// Data directory for the local store and blobs
pub fn data_dir() -> PathBuf {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aula")
}
