//! HTTP DTOs (Data Transfer Objects) for EuPago endpoints.
//!
//! The webhook endpoint itself answers in plain text; these types cover the
//! JSON return-URL and admin endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::handlers::payment::{
    HandleReturnResult, InitiatePaymentResult, RedirectKind, SimulateWebhookResult,
};
use crate::domain::foundation::PaymentId;
use crate::domain::payment::{Outcome, PaymentState};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to simulate a webhook for a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulateWebhookRequest {
    /// Gateway status token to simulate.
    #[serde(default = "default_simulated_status")]
    pub status: String,
}

fn default_simulated_status() -> String {
    "paid".to_string()
}

/// Request to register a created payment with EuPago.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiatePaymentRequest {
    /// Required for MB WAY.
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Card channel id.
    #[serde(default)]
    pub channel: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Outcome of a customer returning from the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnResponse {
    pub payment_id: PaymentId,
    pub order_code: String,
    pub outcome: String,
    pub state: PaymentState,
    /// `order` or `retry`.
    pub redirect: RedirectKind,
}

impl From<HandleReturnResult> for ReturnResponse {
    fn from(result: HandleReturnResult) -> Self {
        Self {
            payment_id: result.payment_id,
            order_code: result.order_code,
            outcome: result.outcome,
            state: result.state,
            redirect: result.redirect,
        }
    }
}

/// Outcome of a simulated webhook.
#[derive(Debug, Clone, Serialize)]
pub struct SimulateWebhookResponse {
    pub payment_id: PaymentId,
    pub outcome: Outcome,
    pub state: PaymentState,
    pub state_changed: bool,
    pub transaction: Value,
}

impl From<SimulateWebhookResult> for SimulateWebhookResponse {
    fn from(result: SimulateWebhookResult) -> Self {
        Self {
            payment_id: result.payment_id,
            outcome: result.outcome,
            state: result.state,
            state_changed: result.state_changed,
            transaction: result.transaction,
        }
    }
}

/// Gateway answer for an initiated payment.
#[derive(Debug, Clone, Serialize)]
pub struct InitiatePaymentResponse {
    pub payment_id: PaymentId,
    pub state: PaymentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl From<InitiatePaymentResult> for InitiatePaymentResponse {
    fn from(result: InitiatePaymentResult) -> Self {
        Self {
            payment_id: result.payment_id,
            state: result.state,
            redirect_url: result.redirect_url,
            reference: result.reference,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
