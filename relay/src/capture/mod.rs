//! Request snapshotting.
//!
//! The body is buffered exactly once; every structured view (form fields,
//! uploads) is decoded from that buffer, and the snapshot owns everything the
//! renderer needs so no transport state leaks further down the pipeline.

pub mod multipart;
pub mod params;

use std::net::SocketAddr;

use axum::{
    body::{self, Bytes},
    extract::{ConnectInfo, Request},
    http::{header, request::Parts, HeaderMap},
};
use http_body_util::LengthLimitError;
use thiserror::Error;
use tracing::{debug, warn};

pub use params::{ParamMap, ParameterSets, UploadedFile};

/// Placeholder for a client address the transport did not supply.
pub const UNKNOWN: &str = "Unknown";

/// Placeholder for a missing Content-Type.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    BodyRead(String),
}

/// Immutable snapshot of one incoming request.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: String,
    pub path: String,
    /// Host the request was addressed to, without any port
    pub host: Option<String>,
    /// Header name/value pairs in arrival order, duplicates kept
    pub headers: Vec<(String, String)>,
    pub content_type: String,
    pub client_addr: String,
    pub body: Bytes,
    pub params: ParameterSets,
}

/// Consume the request, buffering at most `limit` body bytes.
pub async fn capture(request: Request, limit: usize) -> Result<IncomingRequest, CaptureError> {
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(CaptureError::BodyTooLarge { limit });
    }

    let body = body::to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.is::<LengthLimitError>() {
            CaptureError::BodyTooLarge { limit }
        } else {
            CaptureError::BodyRead(inner.to_string())
        }
    })?;

    Ok(snapshot(&parts, body))
}

/// Build a snapshot from request parts and an already-buffered body.
pub fn snapshot(parts: &Parts, body: Bytes) -> IncomingRequest {
    let method = parts.method.as_str().to_string();

    let raw_content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|v| !v.is_empty());

    let client_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let params = ParameterSets::decode(parts.uri.query(), raw_content_type.as_deref(), &body);

    debug!(
        method = %method,
        header_count = parts.headers.len(),
        body_length = body.len(),
        query_params = params.query.len(),
        form_params = params.form.len(),
        files = params.files.len(),
        "request_captured"
    );

    IncomingRequest {
        method,
        path: parts.uri.path().to_string(),
        host: request_host(parts),
        headers: ordered_headers(&parts.headers),
        content_type: raw_content_type.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        client_addr,
        body,
        params,
    }
}

fn ordered_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                canonical_header_name(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Title-case a lowercased header name: `x-request-id` becomes `X-Request-Id`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn request_host(parts: &Parts) -> Option<String> {
    let raw = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.host().map(str::to_string))?;

    let host = strip_port(raw.trim());
    if host.is_empty() {
        warn!(host = %raw, "request_host_unusable");
        return None;
    }
    Some(host.to_string())
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        // IPv6 literal: keep the brackets, drop anything after them.
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}
