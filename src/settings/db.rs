//! Settings store trait and SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use super::error::SettingsError;
use super::schema;

/// Persistent `(section, key) → value` storage.
///
/// Object-safe so it can be shared as `Arc<dyn SettingsStore>` across async
/// tasks; the sync engine depends on exactly this surface.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a value, or `None` if the key has never been written.
    async fn get(&self, section: &str, key: &str) -> Result<Option<String>, SettingsError>;

    /// Write a value, creating or replacing the key.
    async fn set(&self, section: &str, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// SQLite implementation of the settings store.
pub struct SqliteSettingsStore {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync.
    /// Guards are dropped before any await point.
    conn: Mutex<Connection>,
    /// Path to the database file (for error messages).
    path: PathBuf,
}

impl std::fmt::Debug for SqliteSettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSettingsStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteSettingsStore {
    /// Open or create a database at the given path.
    pub async fn open(path: &Path) -> Result<Self, SettingsError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone).map_err(|e| SettingsError::Open {
                path: path_clone.clone(),
                source: e,
            })?;

            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(SettingsError::Migration)?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(SettingsError::Migration)?;

            schema::migrate(&conn)?;

            Ok::<_, SettingsError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, SettingsError> {
        let conn = Connection::open_in_memory().map_err(|e| SettingsError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, section: &str, key: &str) -> Result<Option<String>, SettingsError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::Query(e.to_string()))?;

        conn.query_row(
            "SELECT value FROM settings WHERE section = ?1 AND key = ?2",
            [section, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(SettingsError::query)
    }

    async fn set(&self, section: &str, key: &str, value: &str) -> Result<(), SettingsError> {
        let now = chrono::Utc::now().timestamp();
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::Query(e.to_string()))?;

        conn.execute(
            "INSERT INTO settings (section, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (section, key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            rusqlite::params![section, key, value, now],
        )
        .map_err(SettingsError::query)?;

        Ok(())
    }
}
