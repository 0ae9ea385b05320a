//! Slack delivery via incoming webhook.

use super::{ensure_success, http_client, Notifier, NotifyError, Report};
use crate::config::SlackConfig;
use crate::error::MonitorError;
use crate::retry::{with_backoff, BackoffPolicy};
use serde_json::json;
use tracing::debug;

#[derive(Debug)]
pub struct SlackNotifier {
    client: reqwest::blocking::Client,
    webhook_url: String,
    channel: Option<String>,
    backoff: BackoffPolicy,
}

impl SlackNotifier {
    pub fn from_config(config: &SlackConfig) -> Result<Self, MonitorError> {
        if config.webhook_url.is_empty() {
            return Err(MonitorError::ConfigError(
                "Slack channel enabled but notify.slack.webhook_url is empty".to_string(),
            ));
        }
        let client = http_client().map_err(|e| {
            MonitorError::NotifyError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            channel: config.channel.clone(),
            backoff: BackoffPolicy::default(),
        })
    }

    fn post(&self, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let response = self.client.post(&self.webhook_url).json(payload).send()?;
        ensure_success(response)
    }
}

impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        let mut payload = json!({ "text": report.as_text() });
        if let Some(channel) = &self.channel {
            payload["channel"] = json!(channel);
        }
        with_backoff(&self.backoff, "slack webhook", || self.post(&payload))?;
        debug!("Slack webhook accepted");
        Ok(())
    }
}
