//! Scrobblegate configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Subsonic server connection
    pub server: ServerConfig,

    /// Dispatcher tuning
    pub dispatch: DispatchConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            return Err(eyre!("Subsonic server URL is not set (server.url)"));
        }
        reqwest::Url::parse(self.server.url.trim())
            .map_err(|e| eyre!("Subsonic server URL '{}' is invalid: {}", self.server.url, e))?;
        if self.server.username.is_empty() {
            return Err(eyre!("Missing Subsonic username (server.username)"));
        }
        self.server.get_password()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::search_paths().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// Copy of this config that is safe to print
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        if config.server.password.is_some() {
            config.server.password = Some("********".to_string());
        }
        config
    }

    /// Implicit config locations, in priority order
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".scrobblegate.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("scrobblegate").join("scrobblegate.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// How the password is sent to the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Salted md5 token (`t` + `s` parameters)
    #[default]
    Token,

    /// Hex-encoded password (`p=enc:...`)
    Hex,

    /// Clear-text password (`p=...`)
    Plain,
}

/// Subsonic server connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server base URL, e.g. https://music.example.com
    pub url: String,

    /// Account name
    pub username: String,

    /// Password literal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password (wins over `password`)
    #[serde(rename = "password-env", skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Authentication scheme
    #[serde(rename = "auth-method")]
    pub auth_method: AuthMethod,

    /// Client name sent as the `c` parameter
    #[serde(rename = "client-name")]
    pub client_name: String,

    /// Protocol version sent as the `v` parameter
    #[serde(rename = "api-version")]
    pub api_version: String,

    /// Per-call timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: None,
            password_env: None,
            auth_method: AuthMethod::Token,
            client_name: "scrobblegate".to_string(),
            api_version: "1.16.1".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    /// Resolve the password from the environment or the literal
    pub fn get_password(&self) -> Result<String> {
        if let Some(ref var) = self.password_env {
            return std::env::var(var).map_err(|_| eyre!("Password not found. Set the {} environment variable.", var));
        }
        self.password
            .clone()
            .ok_or_else(|| eyre!("Missing Subsonic password (server.password or server.password-env)"))
    }

    /// Get the call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Dispatcher tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Warn each time the pending queue grows past a multiple of this depth
    #[serde(rename = "queue-warn-depth")]
    pub queue_warn_depth: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { queue_warn_depth: 100 }
    }
}
