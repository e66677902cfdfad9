use std::path::PathBuf;
use std::time::Duration;

use crate::settings::SyncSettings;

/// Sync configuration, loaded once at startup and read-only for the
/// agent's lifetime. Values come from the settings store with CLI
/// overrides taking precedence; overrides are per-run and never written
/// back to the store.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root directory for downloaded clips.
    pub output_root: PathBuf,
    /// Delay between the end of one poll cycle and the start of the next.
    pub poll_interval: Duration,
    /// Rate-limiting sleep after each downloaded item.
    pub inter_item_sleep: Duration,
}

impl SyncConfig {
    pub async fn load(settings: &SyncSettings, cli: &crate::cli::Cli) -> anyhow::Result<Self> {
        let poll_interval = match cli.interval {
            Some(secs) => Duration::from_secs(secs),
            None => settings.poll_interval().await?,
        };
        let inter_item_sleep = match cli.sleep {
            Some(secs) => Duration::from_secs(secs),
            None => settings.inter_item_sleep().await?,
        };
        let output_root = match &cli.output {
            Some(raw) => expand_tilde(raw),
            None => settings.output_root().await?,
        };

        Ok(Self {
            output_root,
            poll_interval,
            inter_item_sleep,
        })
    }
}

/// Expand ~ to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
