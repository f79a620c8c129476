//! Payment gateway port for outbound EuPago calls.
//!
//! Creates a payment at the gateway for one of the supported methods. The
//! gateway answers with a redirect URL (card, pay-by-link), a bank or voucher
//! reference (Multibanco, PayShop) or a pending push (MB WAY). Final status
//! always arrives later by webhook.
//!
//! # Design
//!
//! - **Per-request credentials**: organizers bring their own API key and
//!   endpoint, so one client serves every tenant
//! - **Retryable errors flagged**: timeouts and connection failures are
//!   marked retryable; HTTP errors are not

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::payment::PaymentMethod;

/// Port for the gateway's payment-creation API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment for `request.method`.
    ///
    /// # Errors
    ///
    /// - `NetworkError` on timeout or connection failure (retryable)
    /// - `AuthenticationError` on HTTP 401
    /// - `AccessDenied` on HTTP 403
    /// - `ProviderError` on any other non-2xx or unusable response
    async fn create_payment(
        &self,
        credentials: &GatewayCredentials,
        request: CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError>;
}

/// Organizer credentials for one call.
#[derive(Clone)]
pub struct GatewayCredentials {
    pub api_key: SecretString,

    /// `https://sandbox.eupago.pt` or `https://clientes.eupago.pt`.
    pub base_url: String,
}

impl GatewayCredentials {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: base_url.into(),
        }
    }

    pub fn from_secret(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
        }
    }
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Request to create a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub method: PaymentMethod,

    /// `{orderCode}-P-{localSequence}`.
    pub identifier: String,

    pub amount_cents: i64,
    pub currency: String,

    /// Shown to the customer by card and pay-by-link pages.
    pub description: Option<String>,

    /// MB WAY only.
    pub customer_phone: Option<String>,

    /// Card only; the gateway's channel id.
    pub channel: Option<String>,

    pub urls: CallbackUrls,
}

/// URLs handed to the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackUrls {
    pub webhook: String,
    pub return_base: String,
    pub success: String,
    pub fail: String,
    pub back: String,
}

/// What the gateway returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    /// Page the customer must visit, if any.
    pub redirect_url: Option<String>,

    /// Multibanco or PayShop reference.
    pub reference: Option<String>,

    pub transaction_id: Option<String>,

    /// Full response body, stored in payment info.
    pub response: Value,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Customer-facing message.
    pub message: String,

    /// HTTP status returned by the gateway (if any).
    pub http_status: Option<u16>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Timeout or connection failure.
    NetworkError,

    /// HTTP 401.
    AuthenticationError,

    /// HTTP 403.
    AccessDenied,

    /// Rejected locally before calling the gateway.
    InvalidRequest,

    /// Any other gateway failure.
    ProviderError,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentErrorCode::NetworkError)
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::AccessDenied => "access_denied",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(PaymentError::network("timed out").retryable);
        assert!(!PaymentError::provider("bad").retryable);
        assert!(!PaymentErrorCode::AuthenticationError.is_retryable());
    }

    #[test]
    fn credentials_debug_hides_key() {
        let creds = GatewayCredentials::new("demo-1234", "https://sandbox.eupago.pt");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("demo-1234"));
        assert!(debug.contains("sandbox"));
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::new(PaymentErrorCode::AccessDenied, "Access denied");
        assert_eq!(err.to_string(), "access_denied: Access denied");
    }
}
