//! EuPago payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait over the EuPago REST API.
//!
//! # Authentication
//!
//! Each method authenticates differently:
//! - credit card: `ApiKey: {key}` header
//! - MB WAY, pay-by-link: `Authorization: ApiKey {key}` header
//! - Multibanco, PayShop: `chave` field in the body
//!
//! # Configuration
//!
//! ```ignore
//! let client = EuPagoClient::new(EuPagoClientConfig::default())?;
//! let creds = GatewayCredentials::new(api_key, "https://sandbox.eupago.pt");
//! let created = client.create_payment(&creds, request).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::domain::payment::{ApiKeyPlacement, PaymentMethod};
use crate::ports::{
    CreatePaymentRequest, GatewayCredentials, GatewayPayment, PaymentError, PaymentErrorCode,
    PaymentGateway,
};

use super::wire;

pub const AUTHENTICATION_FAILED: &str =
    "Authentication failed. Please check your EuPago API key configuration.";
pub const ACCESS_DENIED: &str = "Access denied. Please verify your EuPago API permissions.";
pub const COMMUNICATION_FAILED: &str =
    "Payment provider communication failed. Please try again later.";

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct EuPagoClientConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for EuPagoClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl EuPagoClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// EuPago gateway adapter.
pub struct EuPagoClient {
    http_client: reqwest::Client,
}

impl EuPagoClient {
    pub fn new(config: EuPagoClientConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http_client })
    }

    /// Local checks the gateway would reject anyway.
    fn validate(request: &CreatePaymentRequest) -> Result<(), PaymentError> {
        if !request.method.accepts_amount(request.amount_cents) {
            return Err(match request.method {
                PaymentMethod::CreditCard => PaymentError::invalid_request(
                    "Credit card payments are limited to €3999. Please use a different payment method.",
                ),
                _ => PaymentError::invalid_request("Payment amount must be positive"),
            });
        }

        if request.method == PaymentMethod::MbWay
            && request.customer_phone.as_deref().map_or(true, str::is_empty)
        {
            return Err(PaymentError::invalid_request(
                "Phone number is required for MBWay payments",
            ));
        }

        Ok(())
    }

    /// Interprets a parsed 2xx body for `method`.
    fn interpret(method: PaymentMethod, response: Value) -> Result<GatewayPayment, PaymentError> {
        let created = GatewayPayment {
            redirect_url: wire::redirect_url(&response),
            reference: wire::reference(&response),
            transaction_id: wire::transaction_id(&response),
            response,
        };

        match method {
            PaymentMethod::CreditCard | PaymentMethod::PayByLink => {
                if created.redirect_url.is_none() {
                    let reason = wire::error_message(&created.response)
                        .unwrap_or_else(|| "No payment URL returned".to_string());
                    return Err(PaymentError::provider(format!(
                        "Payment initialization failed: {}",
                        reason
                    )));
                }
            }
            PaymentMethod::Multibanco | PaymentMethod::PayShop => {
                if created.response.get("referencia").is_none() {
                    return Err(PaymentError::provider(match method {
                        PaymentMethod::Multibanco => "Multibanco payment reference generation failed",
                        _ => "PayShop payment reference generation failed",
                    }));
                }
            }
            PaymentMethod::MbWay => {
                if !wire::mbway_accepted(&created.response) {
                    return Err(PaymentError::provider("MBWay payment initialization failed"));
                }
            }
        }

        Ok(created)
    }
}

/// Maps a non-2xx status to the customer-facing error.
fn status_error(status: StatusCode) -> PaymentError {
    let err = match status {
        StatusCode::UNAUTHORIZED => {
            PaymentError::new(PaymentErrorCode::AuthenticationError, AUTHENTICATION_FAILED)
        }
        StatusCode::FORBIDDEN => PaymentError::new(PaymentErrorCode::AccessDenied, ACCESS_DENIED),
        _ => PaymentError::provider(COMMUNICATION_FAILED),
    };
    err.with_http_status(status.as_u16())
}

#[async_trait]
impl PaymentGateway for EuPagoClient {
    async fn create_payment(
        &self,
        credentials: &GatewayCredentials,
        request: CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        Self::validate(&request)?;

        let method = request.method;
        let api_key = credentials.api_key.expose_secret();
        let url = format!(
            "{}{}",
            credentials.base_url.trim_end_matches('/'),
            method.endpoint_path()
        );
        let body = wire::request_body(&request, api_key);

        tracing::debug!(
            method = method.provider_id(),
            url = %url,
            body = %wire::redacted(&body),
            "Sending EuPago request"
        );

        let mut builder = self.http_client.post(&url).json(&body);
        builder = match method.key_placement() {
            ApiKeyPlacement::ApiKeyHeader => builder.header("ApiKey", api_key),
            ApiKeyPlacement::AuthorizationHeader => {
                builder.header("Authorization", format!("ApiKey {}", api_key))
            }
            ApiKeyPlacement::BodyField => builder,
        };

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, timeout = e.is_timeout(), "EuPago request failed");
            PaymentError::network(COMMUNICATION_FAILED)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "EuPago API error");
            return Err(status_error(status));
        }

        let parsed: Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse EuPago response");
            PaymentError::provider(COMMUNICATION_FAILED)
        })?;

        Self::interpret(method, parsed)
    }
}
