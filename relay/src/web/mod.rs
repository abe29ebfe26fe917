//! Web server module.
//!
//! `/health` is the only fixed route and answers every method; every other
//! request, whatever its method, falls through to the relay handler.

pub mod handlers;

use axum::{routing::any, Router};
use tower_http::trace::TraceLayer;

pub use handlers::{health, relay, AppState, HealthResponse, INVALID_ADDRESS_MESSAGE, USAGE_PAGE};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", any(health))
        .fallback(relay)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
