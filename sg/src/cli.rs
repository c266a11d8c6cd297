//! CLI command definitions and subcommands

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scrobblegate - submit scrobbles to a Subsonic server
#[derive(Parser)]
#[command(
    name = "sg",
    about = "Submit scrobbles to a Subsonic server with bounded concurrency",
    version,
    after_help = "Logs are written to: ~/.local/share/scrobblegate/logs/scrobblegate.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrobble one or more songs and wait for the server to answer
    Submit {
        /// Server-side song ids, dispatched in the order given
        #[arg(value_name = "SONG_ID", required = true)]
        song_ids: Vec<String>,

        /// Send "now playing" notifications instead of submissions
        #[arg(long)]
        now_playing: bool,

        /// Play start time (RFC 3339), defaults to now
        #[arg(short, long, value_parser = parse_time)]
        time: Option<DateTime<Utc>>,
    },

    /// Print the effective configuration
    Config,
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid time '{}': {}. Use RFC 3339, e.g. 2024-03-01T12:00:00Z", s, e))
}

/// Path of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scrobblegate")
        .join("logs")
        .join("scrobblegate.log")
}
