//! Persistent agent settings and sync checkpoint.
//!
//! The desktop client this agent descends from kept its settings in an INI
//! file keyed by section/key; this module keeps that interface over a small
//! SQLite table. [`SyncSettings`] is the typed view the sync core uses:
//! poll interval, inter-item sleep, output root, and the `LastUpdate`
//! checkpoint that marks the newest fully processed record.

pub mod db;
pub mod error;
pub mod schema;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use db::{SettingsStore, SqliteSettingsStore};
pub use error::SettingsError;

/// Settings section holding all synchronization keys.
pub const SYNC_SECTION: &str = "Synchronize";

/// Checkpoint sentinel predating any possible record, so the first poll
/// requests the entire history.
pub const FAR_PAST_TIMESTAMP: &str = "-999999999-01-01T00:00:00+00:00";

const KEY_INTERVAL: &str = "Interval";
const KEY_SLEEP: &str = "Sleep";
const KEY_OUTPUT: &str = "Output";
const KEY_LAST_UPDATE: &str = "LastUpdate";

const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_SLEEP_SECS: u64 = 20;

/// Typed view over the settings store for the recognized sync keys.
#[derive(Clone)]
pub struct SyncSettings {
    store: Arc<dyn SettingsStore>,
}

impl SyncSettings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    async fn get_secs(&self, key: &str, default: u64) -> Result<Duration, SettingsError> {
        let secs = match self.store.get(SYNC_SECTION, key).await? {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, "unparseable setting, using default");
                default
            }),
            None => default,
        };
        Ok(Duration::from_secs(secs))
    }

    /// Seconds between poll cycles (`Synchronize/Interval`, default 60).
    pub async fn poll_interval(&self) -> Result<Duration, SettingsError> {
        self.get_secs(KEY_INTERVAL, DEFAULT_INTERVAL_SECS).await
    }

    /// Rate-limiting sleep after each downloaded item
    /// (`Synchronize/Sleep`, default 20).
    pub async fn inter_item_sleep(&self) -> Result<Duration, SettingsError> {
        self.get_secs(KEY_SLEEP, DEFAULT_SLEEP_SECS).await
    }

    /// Root directory for downloaded clips (`Synchronize/Output`, default
    /// `<documents>/Download/Videos`).
    pub async fn output_root(&self) -> Result<PathBuf, SettingsError> {
        match self.store.get(SYNC_SECTION, KEY_OUTPUT).await? {
            Some(raw) => Ok(PathBuf::from(raw)),
            None => Ok(default_output_root()),
        }
    }

    /// The sync checkpoint (`Synchronize/LastUpdate`): timestamp of the
    /// newest record fully processed, or the far-past sentinel.
    pub async fn last_update(&self) -> Result<String, SettingsError> {
        Ok(self
            .store
            .get(SYNC_SECTION, KEY_LAST_UPDATE)
            .await?
            .unwrap_or_else(|| FAR_PAST_TIMESTAMP.to_string()))
    }

    /// Advance the checkpoint. Callers only ever pass timestamps of fully
    /// processed records, in ascending order within a cycle.
    pub async fn set_last_update(&self, timestamp: &str) -> Result<(), SettingsError> {
        self.store
            .set(SYNC_SECTION, KEY_LAST_UPDATE, timestamp)
            .await
    }
}

/// Default download root: `<documents>/Download/Videos`, falling back to a
/// relative path when no documents directory is known.
pub fn default_output_root() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Download")
        .join("Videos")
}
