//! Email delivery over SMTP with STARTTLS.

use super::{Notifier, NotifyError, Report};
use crate::config::EmailConfig;
use crate::error::MonitorError;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::debug;

/// SMTP channel. The transport is rebuilt per send; monitor cycles are
/// minutes apart and shared SMTP servers drop idle connections anyway.
#[derive(Debug)]
pub struct EmailNotifier {
    smtp_host: String,
    smtp_port: u16,
    credentials: Option<Credentials>,
    from: String,
    to: String,
}

impl EmailNotifier {
    pub fn from_config(config: &EmailConfig) -> Result<Self, MonitorError> {
        if config.smtp_host.is_empty() {
            return Err(MonitorError::ConfigError(
                "Email channel enabled but notify.email.smtp_host is empty".to_string(),
            ));
        }
        if config.from.is_empty() || config.to.is_empty() {
            return Err(MonitorError::ConfigError(
                "Email channel enabled but notify.email.from/to are not both set".to_string(),
            ));
        }
        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            (None, None) => None,
            _ => {
                return Err(MonitorError::ConfigError(
                    "notify.email.username and notify.email.password must be set together"
                        .to_string(),
                ))
            }
        };
        Ok(Self {
            smtp_host: config.smtp_host.clone(),
            smtp_port: config.smtp_port,
            credentials,
            from: config.from.clone(),
            to: config.to.clone(),
        })
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let mut builder = SmtpTransport::starttls_relay(&self.smtp_host)?.port(self.smtp_port);
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(credentials.clone());
        }
        Ok(builder.build())
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(self.to.parse()?)
            .subject(&report.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(report.body.clone())?;

        let transport = self.transport()?;
        let response = transport.send(&message)?;
        debug!(to = %self.to, code = %response.code(), "Email accepted by SMTP server");
        Ok(())
    }
}
