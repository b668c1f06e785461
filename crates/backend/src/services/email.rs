//! Order notification email delivery.
//!
//! Uses SMTP via lettre. Delivery is best-effort: callers treat a failed
//! send as non-fatal to the flow that triggered it. When the transport is
//! not configured, sending is an explicit logged no-op rather than an
//! error surfaced to customers.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Transport credentials or the admin address are absent.
    #[error("mail transport is not configured")]
    NotConfigured,

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// An outgoing notification message.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Capability to deliver a notification message.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP notifier. Each send opens a scoped connection and releases it
/// afterward regardless of outcome.
pub struct SmtpNotifier {
    config: Option<EmailConfig>,
}

impl SmtpNotifier {
    /// Create a notifier; `None` disables delivery.
    #[must_use]
    pub const fn new(config: Option<EmailConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpNotifier {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let Some(config) = &self.config else {
            tracing::warn!(to = %email.to, "mail transport not configured; notification skipped");
            return Err(EmailError::NotConfigured);
        };

        let message = Message::builder()
            .from(
                config
                    .smtp_username
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(config.smtp_username.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )?;

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        // TLS-on-connect relay; the transport lives for exactly one send.
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        mailer.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "notification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_notifier_returns_not_configured() {
        let notifier = SmtpNotifier::new(None);
        let result = notifier
            .send(OutgoingEmail {
                to: "ada@example.com".to_string(),
                subject: "Order".to_string(),
                text: "text".to_string(),
                html: "<p>html</p>".to_string(),
            })
            .await;

        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }
}
