//! SMTP delivery through lettre.

use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::{Mailbox, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use super::{MailError, Mailer, OutboundMessage};
use crate::config::{Config, SmtpTls};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self, MailError> {
        let builder = match config.smtp_tls {
            SmtpTls::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
            }
            SmtpTls::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
            }
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
        };

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(config.mail_timeout()));

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            tls = ?config.smtp_tls,
            authenticated = config.smtp_user.is_some(),
            "smtp_transport_configured"
        );

        Ok(Self {
            transport: builder.build(),
        })
    }
}

/// Convert to a single-part HTML lettre message. lettre writes MIME-Version itself.
pub fn to_lettre(message: &OutboundMessage) -> Result<Message, MailError> {
    let from = parse_mailbox(&message.from)?;
    let to = parse_mailbox(&message.to)?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .singlepart(SinglePart::html(message.html.clone()))
        .map_err(|e| MailError::Build(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e: AddressError| MailError::Address(format!("{}: {}", address, e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), MailError> {
        let email = to_lettre(message)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        debug!(
            to = %message.to,
            code = %response.code(),
            "smtp_message_accepted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> OutboundMessage {
        OutboundMessage {
            to: to.to_string(),
            from: "no-reply@relay.example.net".to_string(),
            subject: "‼️ Webhook Request Received - 2024-03-05 07:04:09".to_string(),
            html: "<p>hi</p>".to_string(),
        }
    }

    #[test]
    fn test_to_lettre_formats_html_message() {
        let email = to_lettre(&message("user@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("To: user@example.com"));
        assert!(raw.contains("From: no-reply@relay.example.net"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
        assert!(raw.contains("MIME-Version: 1.0"));
    }

    #[test]
    fn test_to_lettre_rejects_bad_address() {
        let err = to_lettre(&message("not an address")).unwrap_err();
        assert!(matches!(err, MailError::Address(_)));
    }

    #[tokio::test]
    async fn test_new_with_each_tls_mode() {
        for tls in [SmtpTls::None, SmtpTls::StartTls, SmtpTls::Tls] {
            let config = Config {
                smtp_host: "smtp.example.com".to_string(),
                smtp_tls: tls,
                smtp_user: Some("relay".to_string()),
                smtp_password: Some("secret".to_string()),
                ..Config::default()
            };
            assert!(SmtpMailer::new(&config).is_ok());
        }
    }
}
