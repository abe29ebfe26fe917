//! HTTP endpoint handlers.
//!
//! The relay handler runs the whole pipeline for one request:
//! 1. Resolve the mailbox from the path (empty path serves the usage page)
//! 2. Snapshot the request, buffering the body once
//! 3. Render the report
//! 4. Dispatch it and acknowledge the caller, whatever the dispatch outcome

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::address::{resolve, ResolveError};
use crate::capture::{capture, CaptureError};
use crate::dispatch::Dispatcher;
use crate::render::render;
use crate::Config;

/// Served verbatim when the path names no mailbox.
pub const USAGE_PAGE: &str = include_str!("../../static/usage.html");

pub const INVALID_ADDRESS_MESSAGE: &str = "Invalid email address provided in URL path.";

const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Relay
// =============================================================================

fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body.into()).into_response()
}

/// Relay any request to the mailbox named in its path.
pub async fn relay(State(state): State<AppState>, request: Request) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let recipient = match resolve(&target) {
        Ok(address) => address,
        Err(ResolveError::NoAddressProvided) => {
            info!(method = %request.method(), "usage_page_served");
            return Html(USAGE_PAGE).into_response();
        }
        Err(ResolveError::InvalidAddress(raw)) => {
            warn!(address = %raw, method = %request.method(), "relay_invalid_address");
            return plain(StatusCode::BAD_REQUEST, INVALID_ADDRESS_MESSAGE);
        }
    };

    let snapshot = match capture(request, state.config.max_body_bytes).await {
        Ok(snapshot) => snapshot,
        Err(e @ CaptureError::BodyTooLarge { .. }) => {
            warn!(recipient = %recipient, error = %e, "relay_body_too_large");
            return plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large.");
        }
        Err(e @ CaptureError::BodyRead(_)) => {
            warn!(recipient = %recipient, error = %e, "relay_body_read_failed");
            return plain(StatusCode::BAD_REQUEST, "Failed to read request body.");
        }
    };

    info!(
        recipient = %recipient,
        method = %snapshot.method,
        client = %snapshot.client_addr,
        content_type = %snapshot.content_type,
        body_length = snapshot.body.len(),
        "relay_request_received"
    );

    let report = render(&snapshot, &recipient, Local::now().naive_local());

    let outcome = state
        .dispatcher
        .deliver(&report, &recipient, snapshot.host.as_deref())
        .await;

    info!(recipient = %recipient, sent = outcome.sent, "relay_acknowledged");

    plain(StatusCode::OK, report.acknowledgement)
}
