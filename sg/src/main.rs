//! Scrobblegate - CLI entry point

use std::fs;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use scrobblegate::cli::{Cli, Command, get_log_path};
use scrobblegate::config::Config;
use scrobblegate::dispatcher::ScrobbleDispatcher;
use scrobblegate::transport::SubsonicTransport;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Submit {
            song_ids,
            now_playing,
            time,
        } => cmd_submit(&config, song_ids, !now_playing, time.unwrap_or_else(Utc::now)).await,
        Command::Config => cmd_config(&config),
    }
}

/// Scrobble every song, wait for the replies, report errors
async fn cmd_submit(
    config: &Config,
    song_ids: Vec<String>,
    submission: bool,
    start_time: chrono::DateTime<Utc>,
) -> Result<()> {
    config.validate()?;

    let transport = SubsonicTransport::from_config(&config.server).context("Failed to create Subsonic transport")?;
    let scrobbler = ScrobbleDispatcher::spawn(Arc::new(transport), config.dispatch.clone());

    info!(count = song_ids.len(), submission, %start_time, "Submitting scrobbles");
    for song_id in &song_ids {
        scrobbler.submit(song_id.as_str(), submission, start_time);
    }

    scrobbler.wait_idle().await?;
    let errors = scrobbler.errors().await?;
    let state = scrobbler.state().await?;
    scrobbler.shutdown().await?;

    println!(
        "Scrobbled {} of {} song(s)",
        state.stats.total_completed - state.stats.total_errors,
        song_ids.len()
    );

    if errors.is_empty() {
        return Ok(());
    }

    for record in &errors {
        eprintln!("error: {}", record.message);
    }
    Err(eyre!("{} scrobble(s) failed", errors.len()))
}

/// Print the effective configuration with secrets masked
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(&config.masked()).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
