//! CLI Tooling
//!
//! Command-line interface for all monitor operations. Every command loads
//! the same layered configuration, so cron jobs and interactive use see
//! identical behavior.

use crate::config::{ConfigLoader, DriftwatchConfig, NotifyConfig};
use crate::error::MonitorError;
use crate::history::{HistoryStore, Snapshot};
use crate::monitor::MonitorService;
use crate::notify::{NotificationHub, Report};
use crate::remote::{RemoteSource, SftpSource};
use crate::tooling::format::{
    format_cycle_text, format_history_text, format_status_text, StatusReport,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Driftwatch CLI - remote file-change monitoring
#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(about = "Watch a remote directory over SFTP and notify on changes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one monitor cycle: list, diff, notify, persist
    Run {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Detect and report changes without notifying or saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Run cycles on an interval until interrupted
    Watch {
        /// Seconds between cycles (defaults to monitor.interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Verify connectivity and the monitored path
    Check,
    /// Show target, channel, and history status
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// History file operations
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Send a test notification through enabled channels
    NotifyTest {
        /// Restrict to one channel (email, slack, line)
        #[arg(long)]
        channel: Option<String>,
    },
    /// Write starter driftwatch.toml and .env.example files
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List tracked files
    Show {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Maximum rows to print (0 = all)
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Back up the history file and start empty
    Reset,
}

enum OutputFormat {
    Text,
    Json,
}

fn parse_output_format(format: &str) -> Result<OutputFormat, MonitorError> {
    match format {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        _ => Err(MonitorError::ConfigError(format!(
            "Invalid output format: {}. Must be text or json",
            format
        ))),
    }
}

const CONFIG_TEMPLATE: &str = r##"# driftwatch configuration
#
# Values here override the global config file; environment variables with
# the DRIFTWATCH prefix override both (nested keys use __, for example
# DRIFTWATCH__SERVER__PASSWORD).

[server]
host = "sftp.example.jp"
port = 2222
username = "your-username"
# Prefer DRIFTWATCH__SERVER__PASSWORD or a .env file for the password.
# key_file = "/home/you/.ssh/id_ed25519"
timeout_secs = 30

[monitor]
target_path = "/web/incoming"
interval_secs = 300
include = "*"
exclude = ["*.tmp"]
skip_hidden = true

[history]
# file = "/var/lib/driftwatch/file_history.json"

[notify.email]
enabled = false
smtp_host = "smtp.example.com"
smtp_port = 587
from = "monitor@example.com"
to = "you@example.com"
# Credentials: DRIFTWATCH__NOTIFY__EMAIL__USERNAME / __PASSWORD

[notify.slack]
enabled = false
webhook_url = ""
# channel = "#alerts"

[notify.line]
enabled = false
# notify_token = ""
# channel_access_token = ""
# user_id = ""

[logging]
level = "info"
format = "text"
output = "file+stderr"
"##;

const ENV_TEMPLATE: &str = r#"# Secrets for driftwatch. Copy to .env and fill in; .env is read at startup.
DRIFTWATCH__SERVER__PASSWORD=
DRIFTWATCH__NOTIFY__EMAIL__USERNAME=
DRIFTWATCH__NOTIFY__EMAIL__PASSWORD=
DRIFTWATCH__NOTIFY__SLACK__WEBHOOK_URL=
DRIFTWATCH__NOTIFY__LINE__NOTIFY_TOKEN=
"#;

/// CLI context carrying the loaded configuration
#[derive(Debug)]
pub struct CliContext {
    config: DriftwatchConfig,
    config_path: Option<PathBuf>,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, MonitorError> {
        let config = ConfigLoader::load(config_path.as_deref())
            .map_err(|e| MonitorError::ConfigError(format!("Failed to load config: {}", e)))?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &DriftwatchConfig {
        &self.config
    }

    /// Initialize logging from config with CLI overrides applied.
    pub fn init_logging(&self, cli: &Cli) -> Result<(), MonitorError> {
        let mut logging = self.config.logging.clone();
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &cli.log_file {
            logging.file = Some(file.clone());
        }
        crate::logging::init_logging(Some(&logging))
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, MonitorError> {
        match command {
            Commands::Run { format, dry_run } => self.execute_run(format, *dry_run),
            Commands::Watch { interval } => self.execute_watch(*interval),
            Commands::Check => self.execute_check(),
            Commands::Status { format } => self.execute_status(format),
            Commands::History { command } => match command {
                HistoryCommands::Show { format, limit } => {
                    self.execute_history_show(format, *limit)
                }
                HistoryCommands::Reset => self.execute_history_reset(),
            },
            Commands::NotifyTest { channel } => self.execute_notify_test(channel.as_deref()),
            Commands::Init { force } => self.execute_init(*force),
        }
    }

    fn execute_run(&self, format: &str, dry_run: bool) -> Result<String, MonitorError> {
        let format = parse_output_format(format)?;
        let service = MonitorService::new(self.config.clone())?.with_dry_run(dry_run);
        let outcome = service.run_once()?;
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&outcome)?),
            OutputFormat::Text => Ok(format_cycle_text(&outcome, dry_run)),
        }
    }

    fn execute_watch(&self, interval: Option<u64>) -> Result<String, MonitorError> {
        let interval_secs = interval.unwrap_or(self.config.monitor.interval_secs);
        if interval_secs == 0 {
            return Err(MonitorError::ConfigError(
                "Watch interval must be at least 1 second".to_string(),
            ));
        }
        let service = MonitorService::new(self.config.clone())?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop_flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| {
            MonitorError::ConfigError(format!("Failed to install signal handler: {}", e))
        })?;

        let cycles = service.run_loop(Duration::from_secs(interval_secs), stop);
        Ok(format!("Watch stopped after {} cycle(s)", cycles))
    }

    fn execute_check(&self) -> Result<String, MonitorError> {
        self.config.validate()?;
        let source = SftpSource::connect(&self.config.server)?;
        let target = &self.config.monitor.target_path;
        if !source.is_dir(target)? {
            return Err(MonitorError::ConfigError(format!(
                "monitor.target_path {} is not a directory on the server",
                target
            )));
        }
        let filter = self.config.monitor.filter()?;
        let files = source.list(target, &filter)?;
        Ok(format!(
            "Connection OK\n  Server: {}@{}:{}\n  Target: {} ({} files visible)",
            self.config.server.username,
            self.config.server.host,
            self.config.server.port,
            target,
            files.len()
        ))
    }

    fn execute_status(&self, format: &str) -> Result<String, MonitorError> {
        let format = parse_output_format(format)?;
        let history = HistoryStore::new(self.config.history.resolve_path()?);
        let (history_exists, snapshot) = if history.exists() {
            (true, history.load()?)
        } else {
            (false, Snapshot::default())
        };

        let server = if self.config.server.host.is_empty() {
            "not configured".to_string()
        } else {
            format!(
                "{}@{}:{}",
                self.config.server.username, self.config.server.host, self.config.server.port
            )
        };
        let data = StatusReport {
            server,
            target_path: self.config.monitor.target_path.clone(),
            interval_secs: self.config.monitor.interval_secs,
            channels: enabled_channels(&self.config.notify),
            config_path: self
                .config_path
                .as_ref()
                .map(|p| p.display().to_string()),
            history_path: history.path().display().to_string(),
            history_exists,
            tracked_files: snapshot.len(),
            last_updated: snapshot.last_updated.map(|t| t.to_rfc3339()),
        };
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&data)?),
            OutputFormat::Text => Ok(format_status_text(&data)),
        }
    }

    fn execute_history_show(&self, format: &str, limit: usize) -> Result<String, MonitorError> {
        let format = parse_output_format(format)?;
        let history = HistoryStore::new(self.config.history.resolve_path()?);
        let snapshot = history.load()?;
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&snapshot)?),
            OutputFormat::Text => Ok(format_history_text(
                &snapshot,
                &history.path().display().to_string(),
                limit,
            )),
        }
    }

    fn execute_history_reset(&self) -> Result<String, MonitorError> {
        let history = HistoryStore::new(self.config.history.resolve_path()?);
        match history.reset()? {
            Some(backup) => Ok(format!(
                "History reset. Previous snapshot backed up to {}\nThe next cycle will report every file as new.",
                backup.display()
            )),
            None => Ok(
                "History reset. No previous snapshot existed; an empty one was created."
                    .to_string(),
            ),
        }
    }

    fn execute_notify_test(&self, channel: Option<&str>) -> Result<String, MonitorError> {
        let hub = NotificationHub::from_config(&self.config.notify)?;
        if hub.is_empty() {
            return Err(MonitorError::ConfigError(
                "No notification channels enabled; enable one under [notify] first".to_string(),
            ));
        }
        let report = Report {
            subject: "[driftwatch] Test notification".to_string(),
            body: format!(
                "Test notification issued at {}.\nIf you can read this, the channel works.",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
        };
        match channel {
            Some(name) => {
                hub.send_via(name, &report)?;
                Ok(format!("Test notification delivered via {}", name))
            }
            None => {
                let outcome = hub.broadcast(&report);
                if outcome.all_failed() {
                    let failures: Vec<String> = outcome
                        .failed
                        .iter()
                        .map(|(name, error)| format!("{}: {}", name, error))
                        .collect();
                    return Err(MonitorError::NotifyError(format!(
                        "All {} channel(s) failed ({})",
                        outcome.total(),
                        failures.join("; ")
                    )));
                }
                Ok(format!(
                    "Test notification delivered via {} of {} channel(s)",
                    outcome.delivered_count(),
                    outcome.total()
                ))
            }
        }
    }

    fn execute_init(&self, force: bool) -> Result<String, MonitorError> {
        let mut created = Vec::new();
        for (name, content) in [
            ("driftwatch.toml", CONFIG_TEMPLATE),
            (".env.example", ENV_TEMPLATE),
        ] {
            let path = PathBuf::from(name);
            if path.exists() && !force {
                return Err(MonitorError::ConfigError(format!(
                    "{} already exists (use --force to overwrite)",
                    name
                )));
            }
            std::fs::write(&path, content)?;
            created.push(name);
        }
        Ok(format!(
            "Created {}\nEdit driftwatch.toml, put secrets in .env, then run: driftwatch check",
            created.join(" and ")
        ))
    }
}

fn enabled_channels(notify: &NotifyConfig) -> Vec<String> {
    let mut channels = Vec::new();
    if notify.email.enabled {
        channels.push("email".to_string());
    }
    if notify.slack.enabled {
        channels.push("slack".to_string());
    }
    if notify.line.enabled {
        channels.push("line".to_string());
    }
    channels
}
