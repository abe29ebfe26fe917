//! Delivery through the Mailgun messages API.
//!
//! Reference: https://documentation.mailgun.com/docs/mailgun/api-reference/openapi-final/tag/Messages/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{MailError, Mailer, OutboundMessage};

pub struct MailgunMailer {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl MailgunMailer {
    pub fn new(
        api_base: &str,
        domain: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v3/{}/messages", api_base.trim_end_matches('/'), domain),
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), MailError> {
        let form = [
            ("from", message.from.as_str()),
            ("to", message.to.as_str()),
            ("subject", message.subject.as_str()),
            ("html", message.html.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            warn!(status = status.as_u16(), detail = %detail, "mailgun_send_rejected");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        debug!(to = %message.to, status = status.as_u16(), "mailgun_message_accepted");

        Ok(())
    }
}
