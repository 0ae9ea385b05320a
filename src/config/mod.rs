//! Configuration types and validation.
//!
//! Precedence, lowest to highest: built-in defaults, global config file
//! (~/.config/driftwatch/config.toml), local file (./driftwatch.toml or
//! --config), environment variables with the DRIFTWATCH prefix and `__`
//! as the nesting separator. Secrets normally arrive through the
//! environment, via dotenv in development.

pub mod loader;

pub use loader::ConfigLoader;

use crate::error::MonitorError;
use crate::logging::LoggingConfig;
use crate::remote::ScanFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftwatchConfig {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
    pub history: HistoryConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

impl DriftwatchConfig {
    /// Check everything a cycle needs before any remote work starts.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.server.host.is_empty() {
            return Err(MonitorError::ConfigError(
                "server.host is required (set it in driftwatch.toml or DRIFTWATCH__SERVER__HOST)"
                    .to_string(),
            ));
        }
        if self.server.username.is_empty() {
            return Err(MonitorError::ConfigError(
                "server.username is required".to_string(),
            ));
        }
        if self.server.password.is_none() && self.server.key_file.is_none() {
            return Err(MonitorError::ConfigError(
                "server.password or server.key_file is required \
                 (DRIFTWATCH__SERVER__PASSWORD is the usual source)"
                    .to_string(),
            ));
        }
        if self.monitor.target_path.is_empty() {
            return Err(MonitorError::ConfigError(
                "monitor.target_path is required".to_string(),
            ));
        }
        if !self.monitor.target_path.starts_with('/') {
            return Err(MonitorError::ConfigError(format!(
                "monitor.target_path must be absolute, got '{}'",
                self.monitor.target_path
            )));
        }
        if self.monitor.interval_secs == 0 {
            return Err(MonitorError::ConfigError(
                "monitor.interval_secs must be at least 1".to_string(),
            ));
        }
        self.monitor.filter().map(|_| ())
    }
}

/// Connection settings for the monitored server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Password auth; usually injected as DRIFTWATCH__SERVER__PASSWORD.
    pub password: Option<String>,
    /// Private key auth, used when no password is set.
    pub key_file: Option<PathBuf>,
    /// Connect and per-operation timeout.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            // Shared hosting SFTP commonly listens here rather than 22.
            port: 2222,
            username: String::new(),
            password: None,
            key_file: None,
            timeout_secs: 30,
        }
    }
}

/// What to scan and how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Absolute remote directory to walk.
    pub target_path: String,
    /// Seconds between cycles in watch mode.
    pub interval_secs: u64,
    /// Glob over file names; `*` reports every file.
    pub include: String,
    /// Globs over file and directory names; matches are pruned.
    pub exclude: Vec<String>,
    /// Skip dotfiles and dot-directories.
    pub skip_hidden: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_path: String::new(),
            interval_secs: 300,
            include: "*".to_string(),
            exclude: vec!["*.tmp".to_string()],
            skip_hidden: true,
        }
    }
}

impl MonitorConfig {
    /// Compile the include/exclude globs.
    pub fn filter(&self) -> Result<ScanFilter, MonitorError> {
        ScanFilter::new(&self.include, &self.exclude, self.skip_hidden)
    }
}

/// Where the snapshot lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Explicit history file path; defaults to the user data directory.
    pub file: Option<PathBuf>,
}

impl HistoryConfig {
    pub fn resolve_path(&self) -> Result<PathBuf, MonitorError> {
        if let Some(file) = &self.file {
            return Ok(file.clone());
        }
        directories::ProjectDirs::from("", "driftwatch", "driftwatch")
            .map(|dirs| dirs.data_dir().join("file_history.json"))
            .ok_or_else(|| {
                MonitorError::ConfigError(
                    "Could not determine a data directory for the history file; \
                     set history.file explicitly"
                        .to_string(),
                )
            })
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub email: EmailConfig,
    pub slack: SlackConfig,
    pub line: LineConfig,
}

impl NotifyConfig {
    pub fn any_enabled(&self) -> bool {
        self.email.enabled || self.slack.enabled || self.line.enabled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub to: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: 587,
            username: None,
            password: None,
            from: String::new(),
            to: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub webhook_url: String,
    /// Override the webhook's default channel.
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub enabled: bool,
    /// Personal Notify endpoint token.
    pub notify_token: Option<String>,
    /// Messaging API channel token, used with `user_id`.
    pub channel_access_token: Option<String>,
    pub user_id: Option<String>,
}
