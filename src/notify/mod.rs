//! Notification fanout.
//!
//! Channels are thin senders behind [`Notifier`]. The hub walks every
//! enabled channel and isolates failures: one unreachable endpoint never
//! blocks the rest, and a cycle never aborts because a webhook was down.

pub mod email;
pub mod line;
pub mod slack;

pub use email::EmailNotifier;
pub use line::LineNotifier;
pub use slack::SlackNotifier;

use crate::config::NotifyConfig;
use crate::error::MonitorError;
use crate::retry::Transient;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// One message, rendered once, delivered through every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Subject line; used verbatim by email, folded into the text by
    /// webhook channels.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl Report {
    /// Single-string rendition for channels without a subject field.
    pub fn as_text(&self) -> String {
        format!("{}\n\n{}", self.subject, self.body)
    }
}

/// Channel-level delivery failure.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Email(#[from] lettre::error::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after: Option<u64>,
    },
}

impl Transient for NotifyError {
    fn is_transient(&self) -> bool {
        match self {
            NotifyError::Http(e) => e.is_timeout() || e.is_connect(),
            NotifyError::Status { status, .. } => *status == 429 || *status >= 500,
            NotifyError::Smtp(e) => e.is_transient(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            NotifyError::Status {
                retry_after: Some(seconds),
                ..
            } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }
}

/// A delivery channel.
pub trait Notifier {
    fn name(&self) -> &'static str;

    fn send(&self, report: &Report) -> Result<(), NotifyError>;
}

const USER_AGENT: &str = concat!("driftwatch/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_BODY_LIMIT: usize = 200;

/// Shared HTTP client for webhook channels.
pub(crate) fn http_client() -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}

/// Map a non-2xx response to a status error, keeping any Retry-After hint.
pub(crate) fn ensure_success(response: reqwest::blocking::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok());
    let mut body = response.text().unwrap_or_default();
    if body.len() > STATUS_BODY_LIMIT {
        body.truncate(
            (0..=STATUS_BODY_LIMIT)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0),
        );
    }
    Err(NotifyError::Status {
        status: status.as_u16(),
        body,
        retry_after,
    })
}

/// Per-channel results of one broadcast.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    pub fn total(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn all_failed(&self) -> bool {
        self.delivered.is_empty() && !self.failed.is_empty()
    }
}

/// Fanout over the enabled channels.
#[derive(Default)]
pub struct NotificationHub {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the hub from configuration, one channel per enabled section.
    ///
    /// Channel construction validates required fields, so a half-filled
    /// section fails here rather than mid-cycle.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, MonitorError> {
        let mut hub = Self::new();
        if config.email.enabled {
            hub.push(Box::new(EmailNotifier::from_config(&config.email)?));
        }
        if config.slack.enabled {
            hub.push(Box::new(SlackNotifier::from_config(&config.slack)?));
        }
        if config.line.enabled {
            hub.push(Box::new(LineNotifier::from_config(&config.line)?));
        }
        Ok(hub)
    }

    pub fn push(&mut self, channel: Box<dyn Notifier>) {
        self.channels.push(channel);
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Deliver `report` through every channel, collecting per-channel
    /// outcomes instead of failing fast.
    pub fn broadcast(&self, report: &Report) -> DeliveryReport {
        let mut outcome = DeliveryReport::default();
        for channel in &self.channels {
            match channel.send(report) {
                Ok(()) => {
                    info!(channel = channel.name(), "Notification delivered");
                    outcome.delivered.push(channel.name());
                }
                Err(e) => {
                    error!(channel = channel.name(), error = %e, "Notification failed");
                    outcome.failed.push((channel.name(), e.to_string()));
                }
            }
        }
        outcome
    }

    /// Deliver `report` through a single named channel.
    pub fn send_via(&self, name: &str, report: &Report) -> Result<(), MonitorError> {
        let channel = self
            .channels
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| {
                MonitorError::ConfigError(format!(
                    "Unknown or disabled channel '{}' (enabled: {})",
                    name,
                    self.channel_names().join(", ")
                ))
            })?;
        channel
            .send(report)
            .map_err(|e| MonitorError::NotifyError(format!("{}: {}", name, e)))
    }
}
