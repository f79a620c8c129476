//! HTTP adapters - REST API implementations.

pub mod webhook;

use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use webhook::{eupago_router, EuPagoAppState};

/// Build the service router with request tracing. `request_timeout` bounds
/// the return and admin endpoints.
pub fn app(state: EuPagoAppState, request_timeout: Duration) -> Router {
    eupago_router(request_timeout)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
