//! Store configuration.
//!
//! `StoreConfig` is plain serde data so embedders can load it from whatever
//! format they already use; missing fields fall back to defaults.

use crate::db::{open_db_in_memory_with_timeout, open_db_with_timeout, DbError};
use crate::logging::{default_log_level, init_logging, LoggingError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Where the store keeps its data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseLocation {
    /// Private in-memory database, gone when the connection drops.
    #[default]
    Memory,
    /// SQLite file, created on first open.
    File { path: PathBuf },
}

/// Settings for opening a store connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: DatabaseLocation,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    pub log_level: String,
    /// Absolute directory for log files. Logging stays off when unset.
    pub log_dir: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseLocation::Memory,
            busy_timeout_ms: 5_000,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Errors from [`StoreConfig::open`].
#[derive(Debug)]
pub enum StoreError {
    Logging(LoggingError),
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<LoggingError> for StoreError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl StoreConfig {
    /// In-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store at `path` with default settings.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseLocation::File { path: path.into() },
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Starts logging when `log_dir` is set, then opens a migrated connection.
    pub fn open(&self) -> Result<Connection, StoreError> {
        if let Some(log_dir) = self.log_dir.as_deref() {
            init_logging(&self.log_level, log_dir)?;
        }

        let conn = match &self.database {
            DatabaseLocation::Memory => open_db_in_memory_with_timeout(self.busy_timeout())?,
            DatabaseLocation::File { path } => open_db_with_timeout(path, self.busy_timeout())?,
        };
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::{DatabaseLocation, StoreConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: StoreConfig = serde_json::from_value(serde_json::json!({
            "database": { "kind": "file", "path": "/tmp/blog.db" }
        }))
        .unwrap();

        assert_eq!(
            config.database,
            DatabaseLocation::File {
                path: PathBuf::from("/tmp/blog.db")
            }
        );
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn empty_object_is_in_memory() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::in_memory());
    }

    #[test]
    fn open_in_memory_applies_migrations() {
        let conn = StoreConfig::in_memory().open().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }
}
