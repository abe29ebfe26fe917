//! Report dispatch.
//!
//! One best-effort send per request, bounded by a timeout. The outcome is
//! logged and returned for the caller's benefit only; it never changes what
//! the webhook caller is told.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{error, info};

use crate::address::ResolvedAddress;
use crate::mail::{MailError, Mailer, OutboundMessage};
use crate::render::Report;

/// Prefix of every report subject; the capture timestamp follows.
pub const SUBJECT_PREFIX: &str = "‼️ Webhook Request Received - ";

/// Sender host when neither configuration nor the request names one.
pub const FALLBACK_HOST: &str = "localhost";

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub sent: bool,
    pub recipient: String,
    pub failure: Option<String>,
}

impl DeliveryOutcome {
    fn sent(recipient: &ResolvedAddress) -> Self {
        Self {
            sent: true,
            recipient: recipient.to_string(),
            failure: None,
        }
    }

    fn failed(recipient: &ResolvedAddress, error: &MailError) -> Self {
        Self {
            sent: false,
            recipient: recipient.to_string(),
            failure: Some(error.to_string()),
        }
    }
}

/// Composes report messages and hands them to a [`Mailer`].
#[derive(Clone)]
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    server_name: Option<String>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, server_name: Option<String>, timeout: Duration) -> Self {
        Self {
            mailer,
            server_name,
            timeout,
        }
    }

    /// Sender for a request that arrived for `request_host`.
    ///
    /// A configured server name wins over the request's Host header.
    pub fn sender(&self, request_host: Option<&str>) -> String {
        let host = self
            .server_name
            .as_deref()
            .or(request_host)
            .filter(|h| !h.is_empty())
            .unwrap_or(FALLBACK_HOST);
        format!("no-reply@{}", host)
    }

    /// Build the message for `report` without sending it. The transport
    /// derives the MIME-Version, HTML Content-Type and From headers from it.
    pub fn compose(
        &self,
        report: &Report,
        to: &ResolvedAddress,
        request_host: Option<&str>,
    ) -> OutboundMessage {
        let from = self.sender(request_host);

        OutboundMessage {
            to: to.to_string(),
            subject: format!("{}{}", SUBJECT_PREFIX, report.captured_at),
            html: report.html.clone().into_string(),
            from,
        }
    }

    /// Send `report` to `to`. Exactly one attempt is made.
    pub async fn deliver(
        &self,
        report: &Report,
        to: &ResolvedAddress,
        request_host: Option<&str>,
    ) -> DeliveryOutcome {
        let message = self.compose(report, to, request_host);

        let result = match timeout(self.timeout, self.mailer.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(MailError::Timeout(self.timeout)),
        };

        match result {
            Ok(()) => {
                info!(
                    recipient = %to,
                    from = %message.from,
                    html_length = message.html.len(),
                    "delivery_sent"
                );
                DeliveryOutcome::sent(to)
            }
            Err(e) => {
                error!(recipient = %to, error = %e, "delivery_failed");
                DeliveryOutcome::failed(to, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Bytes;
    use chrono::NaiveDate;

    use crate::address::resolve;
    use crate::capture::{IncomingRequest, ParameterSets};
    use crate::mail::smtp::to_lettre;
    use crate::render::render;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, message: &OutboundMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Mailer for Failing {
        async fn send(&self, _message: &OutboundMessage) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }

    struct Hanging;

    #[async_trait]
    impl Mailer for Hanging {
        async fn send(&self, _message: &OutboundMessage) -> Result<(), MailError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn report() -> Report {
        let snapshot = IncomingRequest {
            method: "POST".to_string(),
            path: "/user%40example.com".to_string(),
            host: None,
            headers: Vec::new(),
            content_type: "N/A".to_string(),
            client_addr: "Unknown".to_string(),
            body: Bytes::from_static(b"hello"),
            params: ParameterSets::default(),
        };
        let at = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 1)
            .unwrap();
        render(&snapshot, &resolve("/user%40example.com").unwrap(), at)
    }

    #[test]
    fn test_sender_precedence() {
        let configured = Dispatcher::new(
            Arc::new(Recording::default()),
            Some("hooks.example.org".to_string()),
            Duration::from_secs(1),
        );
        assert_eq!(configured.sender(Some("other.host")), "no-reply@hooks.example.org");

        let unconfigured = Dispatcher::new(Arc::new(Recording::default()), None, Duration::from_secs(1));
        assert_eq!(unconfigured.sender(Some("relay.example.net")), "no-reply@relay.example.net");
        assert_eq!(unconfigured.sender(None), "no-reply@localhost");
        assert_eq!(unconfigured.sender(Some("")), "no-reply@localhost");
    }

    #[test]
    fn test_compose() {
        let dispatcher = Dispatcher::new(Arc::new(Recording::default()), None, Duration::from_secs(1));
        let to = resolve("/user%40example.com").unwrap();

        let message = dispatcher.compose(&report(), &to, Some("relay.example.net"));

        assert_eq!(message.to, "user@example.com");
        assert_eq!(message.subject, "‼️ Webhook Request Received - 2024-12-31 23:59:01");
        assert_eq!(message.from, "no-reply@relay.example.net");
        assert!(message.html.contains("<pre>hello</pre>"));
    }

    #[test]
    fn test_composed_headers_reach_the_wire() {
        let dispatcher = Dispatcher::new(Arc::new(Recording::default()), None, Duration::from_secs(1));
        let to = resolve("/user%40example.com").unwrap();
        let message = dispatcher.compose(&report(), &to, Some("relay.example.net"));

        let raw = String::from_utf8(to_lettre(&message).unwrap().formatted()).unwrap();

        assert!(raw.contains("MIME-Version: 1.0\r\n"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(raw.contains("From: no-reply@relay.example.net\r\n"));
        assert!(raw.contains("To: user@example.com\r\n"));
    }

    #[tokio::test]
    async fn test_deliver_sends_once() {
        let mailer = Arc::new(Recording::default());
        let dispatcher = Dispatcher::new(mailer.clone(), None, Duration::from_secs(1));
        let to = resolve("/user%40example.com").unwrap();

        let outcome = dispatcher.deliver(&report(), &to, None).await;

        assert!(outcome.sent);
        assert_eq!(outcome.recipient, "user@example.com");
        assert_eq!(outcome.failure, None);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deliver_failure_is_recorded() {
        let dispatcher = Dispatcher::new(Arc::new(Failing), None, Duration::from_secs(1));
        let to = resolve("/user%40example.com").unwrap();

        let outcome = dispatcher.deliver(&report(), &to, None).await;

        assert!(!outcome.sent);
        assert!(outcome.failure.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_deliver_times_out() {
        let dispatcher = Dispatcher::new(Arc::new(Hanging), None, Duration::from_millis(20));
        let to = resolve("/user%40example.com").unwrap();

        let outcome = dispatcher.deliver(&report(), &to, None).await;

        assert!(!outcome.sent);
        assert!(outcome.failure.unwrap().starts_with("timed out"));
    }
}
