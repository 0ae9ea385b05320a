//! LINE delivery.
//!
//! Supports the personal Notify endpoint (token only) and the Messaging
//! API push endpoint (channel token plus target user). When both are
//! configured the Notify token wins; it is the simpler integration.

use super::{ensure_success, http_client, Notifier, NotifyError, Report};
use crate::config::LineConfig;
use crate::error::MonitorError;
use crate::retry::{with_backoff, BackoffPolicy};
use serde_json::json;
use tracing::debug;

const NOTIFY_ENDPOINT: &str = "https://notify-api.line.me/api/notify";
const PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

// LINE rejects messages beyond this length.
const MESSAGE_LIMIT: usize = 1000;

#[derive(Debug)]
enum LineEndpoint {
    Notify {
        token: String,
    },
    MessagingApi {
        channel_access_token: String,
        user_id: String,
    },
}

#[derive(Debug)]
pub struct LineNotifier {
    client: reqwest::blocking::Client,
    endpoint: LineEndpoint,
    backoff: BackoffPolicy,
}

impl LineNotifier {
    pub fn from_config(config: &LineConfig) -> Result<Self, MonitorError> {
        let endpoint = if let Some(token) = &config.notify_token {
            LineEndpoint::Notify {
                token: token.clone(),
            }
        } else {
            match (&config.channel_access_token, &config.user_id) {
                (Some(token), Some(user_id)) => LineEndpoint::MessagingApi {
                    channel_access_token: token.clone(),
                    user_id: user_id.clone(),
                },
                _ => {
                    return Err(MonitorError::ConfigError(
                        "LINE channel enabled but neither notify.line.notify_token nor \
                         notify.line.channel_access_token + notify.line.user_id are set"
                            .to_string(),
                    ))
                }
            }
        };
        let client = http_client().map_err(|e| {
            MonitorError::NotifyError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self {
            client,
            endpoint,
            backoff: BackoffPolicy::default(),
        })
    }

    fn post(&self, message: &str) -> Result<(), NotifyError> {
        let response = match &self.endpoint {
            LineEndpoint::Notify { token } => self
                .client
                .post(NOTIFY_ENDPOINT)
                .bearer_auth(token)
                .form(&[("message", message)])
                .send()?,
            LineEndpoint::MessagingApi {
                channel_access_token,
                user_id,
            } => self
                .client
                .post(PUSH_ENDPOINT)
                .bearer_auth(channel_access_token)
                .json(&json!({
                    "to": user_id,
                    "messages": [{ "type": "text", "text": message }],
                }))
                .send()?,
        };
        ensure_success(response)
    }
}

impl Notifier for LineNotifier {
    fn name(&self) -> &'static str {
        "line"
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        let mut message = report.as_text();
        if message.len() > MESSAGE_LIMIT {
            message.truncate(
                (0..=MESSAGE_LIMIT)
                    .rev()
                    .find(|i| message.is_char_boundary(*i))
                    .unwrap_or(0),
            );
        }
        with_backoff(&self.backoff, "line push", || self.post(&message))?;
        debug!("LINE message accepted");
        Ok(())
    }
}
