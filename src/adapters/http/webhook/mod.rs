//! EuPago HTTP adapter - webhook, return-URL and admin endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    ErrorResponse, InitiatePaymentRequest, InitiatePaymentResponse, ReturnResponse,
    SimulateWebhookRequest, SimulateWebhookResponse,
};
pub use handlers::{
    AdminAccess, AdminAuthenticationRequired, EuPagoAppState, PaymentApiError,
    WebhookResponseError, HEALTH_BODY,
};
pub use routes::{admin_routes, eupago_router, return_routes, webhook_routes};
