use async_trait::async_trait;

use super::{MailError, Mailer, OutboundMessage};

/// Logs messages instead of sending them. For local development.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            html_length = message.html.len(),
            "console_mail_sent"
        );
        Ok(())
    }
}
