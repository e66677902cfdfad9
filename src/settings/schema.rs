//! Settings database schema and migrations.

use rusqlite::Connection;

use super::error::SettingsError;

/// Current schema version. Increment when making schema changes.
pub const SCHEMA_VERSION: i32 = 1;

/// Schema DDL for version 1.
///
/// A single `(section, key) → value` table mirrors the section/key layout
/// of the desktop client's INI settings file this store replaces.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    section TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (section, key)
);
"#;

fn get_schema_version(conn: &Connection) -> Result<i32, SettingsError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SettingsError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Initialize or migrate the database schema.
///
/// Idempotent; safe to call on both new and existing databases.
pub(crate) fn migrate(conn: &Connection) -> Result<(), SettingsError> {
    let found = get_schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(SettingsError::UnsupportedSchemaVersion {
            found,
            expected: SCHEMA_VERSION,
        });
    }
    if found < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}
