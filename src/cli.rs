use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "camsync-rs",
    about = "Synchronize camera-cloud video clips to local storage"
)]
pub struct Cli {
    /// Camera-cloud API host
    #[arg(long)]
    pub host: String,

    /// Camera-cloud API port
    #[arg(long, default_value_t = 443)]
    pub port: u16,

    /// Service auth token.
    /// WARNING: passing via --token is visible in process listings.
    /// Prefer the CAMSYNC_TOKEN environment variable instead.
    #[arg(long, env = "CAMSYNC_TOKEN")]
    pub token: String,

    /// Directory holding the settings/checkpoint database
    #[arg(long, default_value = "~/.camsync-rs")]
    pub data_dir: String,

    /// Override the output root for downloaded clips
    #[arg(long)]
    pub output: Option<String>,

    /// Override the poll interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Override the per-item rate-limit sleep in seconds
    #[arg(long)]
    pub sleep: Option<u64>,

    /// Run a single poll cycle and exit instead of scheduling
    #[arg(long)]
    pub once: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
