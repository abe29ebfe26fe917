//! Outbound mail transports.
//!
//! The dispatcher only sees the [`Mailer`] trait; which transport backs it is
//! chosen once at startup from [`Config::mail_transport`].

pub mod console;
pub mod mailgun;
pub mod smtp;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, MailTransport};

pub use console::ConsoleMailer;
pub use mailgun::MailgunMailer;
pub use smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by mail service ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A fully composed message ready for a transport.
///
/// Every transport sends `html` as a UTF-8 `text/html` MIME 1.0 body from
/// `from`; those headers are derived from the fields, never supplied raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html: String,
}

/// Hands a message to some mail service. `Ok` means the service accepted it,
/// not that it reached the mailbox.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), MailError>;
}

/// Build the transport selected by the configuration.
pub fn from_config(config: &Config) -> Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.mail_transport {
        MailTransport::Smtp => {
            Arc::new(SmtpMailer::new(config).context("Failed to configure SMTP transport")?)
        }
        MailTransport::Mailgun => {
            let api_key = config
                .mailgun_api_key
                .clone()
                .context("MAILGUN_API_KEY is required for the mailgun transport")?;
            let domain = config
                .mailgun_domain
                .clone()
                .context("MAILGUN_DOMAIN is required for the mailgun transport")?;
            Arc::new(
                MailgunMailer::new(&config.mailgun_api_base, &domain, api_key, config.mail_timeout())
                    .context("Failed to configure Mailgun transport")?,
            )
        }
        MailTransport::Console => Arc::new(ConsoleMailer),
    };

    Ok(mailer)
}
