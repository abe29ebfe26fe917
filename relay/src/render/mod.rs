//! Report rendering.
//!
//! `render` is a pure function of the snapshot, the recipient and the capture
//! time. It performs no I/O. Request-derived values are handed to the template
//! as plain text and maud escapes them on the way into the markup.

pub mod template;

use chrono::NaiveDateTime;
use maud::Markup;

use crate::address::ResolvedAddress;
use crate::capture::{IncomingRequest, ParamMap, ParameterSets};

use template::Sections;

/// `YYYY-MM-DD HH:MM:SS`, always 19 characters.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered view of one snapshot.
#[derive(Debug, Clone)]
pub struct Report {
    /// Capture time formatted with [`TIMESTAMP_FORMAT`]
    pub captured_at: String,
    /// The email body
    pub html: Markup,
    /// Plain-text reply for the webhook caller
    pub acknowledgement: String,
}

/// Render the report for `snapshot`, captured at `captured_at` (server local time).
pub fn render(
    snapshot: &IncomingRequest,
    recipient: &ResolvedAddress,
    captured_at: NaiveDateTime,
) -> Report {
    let timestamp = format_timestamp(&captured_at);

    let headers: String = snapshot
        .headers
        .iter()
        .map(|(name, value)| format!("{}: {}\n", name, value))
        .collect();

    let html = template::document(&Sections {
        received: format!("Date: {}", timestamp),
        information: format!(
            "IP Address: {}\nRequest Method: {}\nRequest Path: {}\nContent-Type: {}",
            snapshot.client_addr, snapshot.method, snapshot.path, snapshot.content_type
        ),
        headers,
        body: String::from_utf8_lossy(&snapshot.body).into_owned(),
        parameters: dump_parameters(&snapshot.params),
    });

    Report {
        acknowledgement: acknowledgement(recipient, &snapshot.params.request),
        captured_at: timestamp,
        html,
    }
}

pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Pretty JSON of all parameter sets. Keys are sorted, so equal sets dump identically.
pub fn dump_parameters(params: &ParameterSets) -> String {
    serde_json::to_string_pretty(params).unwrap_or_else(|_| "{}".to_string())
}

/// The plain-text reply returned to the webhook caller.
pub fn acknowledgement(recipient: &ResolvedAddress, request: &ParamMap) -> String {
    let dump = serde_json::to_string_pretty(request).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Webhook received and forwarded to: {}\n\nRequest data:\n{}\n",
        recipient, dump
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Bytes;
    use chrono::NaiveDate;

    use crate::address::resolve;
    use crate::capture::UploadedFile;

    fn captured_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(7, 4, 9)
            .unwrap()
    }

    fn sample_request() -> IncomingRequest {
        let mut params = ParameterSets::decode(Some("id=42"), None, b"");
        params.files.insert(
            "upload".to_string(),
            vec![UploadedFile {
                filename: "a.txt".to_string(),
                size: 3,
                content_type: "text/plain".to_string(),
                storage_ref: "sha256:abc".to_string(),
            }],
        );

        IncomingRequest {
            method: "POST".to_string(),
            path: "/user%40example.com".to_string(),
            host: Some("relay.example.net".to_string()),
            headers: vec![
                ("Host".to_string(), "relay.example.net".to_string()),
                ("X-Test".to_string(), "1".to_string()),
            ],
            content_type: "text/plain".to_string(),
            client_addr: "198.51.100.4".to_string(),
            body: Bytes::from_static(b"hello\n  indented"),
            params,
        }
    }

    #[test]
    fn test_format_timestamp_zero_padded() {
        assert_eq!(format_timestamp(&captured_at()), "2024-03-05 07:04:09");
    }

    #[test]
    fn test_render_sections() {
        let recipient = resolve("/user%40example.com").unwrap();
        let report = render(&sample_request(), &recipient, captured_at());
        let html = report.html.clone().into_string();

        assert_eq!(report.captured_at, "2024-03-05 07:04:09");
        assert!(html.contains("<pre>Date: 2024-03-05 07:04:09</pre>"));
        assert!(html.contains(
            "<pre>IP Address: 198.51.100.4\nRequest Method: POST\nRequest Path: /user%40example.com\nContent-Type: text/plain</pre>"
        ));
        assert!(html.contains("<pre>Host: relay.example.net\nX-Test: 1\n</pre>"));
        assert!(html.contains("<pre>hello\n  indented</pre>"));
        assert!(html.contains("&quot;storage_ref&quot;: &quot;sha256:abc&quot;"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let recipient = resolve("/user%40example.com").unwrap();
        let first = render(&sample_request(), &recipient, captured_at());
        let second = render(&sample_request(), &recipient, captured_at());

        assert_eq!(first.html.into_string(), second.html.into_string());
        assert_eq!(first.acknowledgement, second.acknowledgement);
    }

    #[test]
    fn test_render_escapes_request_data() {
        let recipient = resolve("/user%40example.com").unwrap();
        let mut request = sample_request();
        request.headers = vec![(
            "X-Evil".to_string(),
            "\"><script>alert(1)</script>".to_string(),
        )];
        request.body = Bytes::from_static(b"</pre><h1>owned</h1> & 'quoted'");
        request.content_type = "<i>ct</i>".to_string();

        let html = render(&request, &recipient, captured_at()).html.into_string();

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<h1>"));
        assert!(!html.contains("<i>"));
        assert!(html.contains("Content-Type: &lt;i&gt;ct&lt;/i&gt;"));
        assert!(html.contains("X-Evil: &quot;&gt;&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("&lt;/pre&gt;&lt;h1&gt;owned&lt;/h1&gt; &amp; 'quoted'"));
        assert_eq!(html.matches("<pre>").count(), 5);
        assert_eq!(html.matches("</pre>").count(), 5);
    }

    #[test]
    fn test_render_lossy_body() {
        let recipient = resolve("/user%40example.com").unwrap();
        let mut request = sample_request();
        request.body = Bytes::from_static(&[b'o', b'k', 0xff, b'!']);

        let html = render(&request, &recipient, captured_at()).html.into_string();

        assert!(html.contains("<pre>ok\u{FFFD}!</pre>"));
    }

    #[test]
    fn test_acknowledgement() {
        let recipient = resolve("/user%40example.com").unwrap();
        let report = render(&sample_request(), &recipient, captured_at());

        assert!(report
            .acknowledgement
            .starts_with("Webhook received and forwarded to: user@example.com\n\nRequest data:\n"));
        assert!(report.acknowledgement.contains("\"id\": [\n    \"42\"\n  ]"));
    }

    #[test]
    fn test_acknowledgement_empty_params() {
        let recipient = resolve("/user%40example.com").unwrap();
        let ack = acknowledgement(&recipient, &ParamMap::new());
        assert_eq!(
            ack,
            "Webhook received and forwarded to: user@example.com\n\nRequest data:\n{}\n"
        );
    }
}
