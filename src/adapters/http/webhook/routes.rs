//! Axum router configuration for EuPago endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{
    customer_return, customer_return_base, initiate_payment, receive_webhook, simulate_webhook,
    webhook_health, EuPagoAppState,
};

/// Create the gateway-facing webhook router.
///
/// # Routes
/// - `GET /health` - Liveness check
/// - `GET /:tenant` - v1 notification (query parameters)
/// - `POST /:tenant` - v2 notification (JSON, possibly encrypted) or v1 form
pub fn webhook_routes() -> Router<EuPagoAppState> {
    Router::new()
        .route("/health", get(webhook_health))
        .route("/:tenant", get(receive_webhook).post(receive_webhook))
}

/// Create the customer return-URL router.
///
/// # Routes
/// - `GET /:tenant/:order/:payment_id` - Card return URL
/// - `GET /:tenant/:order/:payment_id/:status` - `success`, `fail` or `back`
pub fn return_routes() -> Router<EuPagoAppState> {
    Router::new()
        .route("/:tenant/:order/:payment_id", get(customer_return_base))
        .route("/:tenant/:order/:payment_id/:status", get(customer_return))
}

/// Create the organizer admin router.
///
/// # Routes
/// - `POST /:tenant/payments/:id/simulate` - Simulate a webhook (debug mode only)
/// - `POST /:tenant/payments/:id/initiate` - Register a payment with EuPago
pub fn admin_routes() -> Router<EuPagoAppState> {
    Router::new()
        .route("/:tenant/payments/:id/simulate", post(simulate_webhook))
        .route("/:tenant/payments/:id/initiate", post(initiate_payment))
}

/// Create the complete EuPago router.
///
/// Return and admin requests are cut off after `request_timeout`. Webhooks
/// are not: the gateway retries on its own schedule, and a delivery that has
/// started writing is left to finish.
///
/// ```ignore
/// let app = eupago_router(Duration::from_secs(60)).with_state(state);
/// ```
pub fn eupago_router(request_timeout: Duration) -> Router<EuPagoAppState> {
    let timed = Router::new()
        .nest("/return", return_routes())
        .nest("/admin", admin_routes())
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/webhooks/eupago", webhook_routes())
        .merge(timed)
}
