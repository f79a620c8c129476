//! Webhook error types for EuPago notification handling.
//!
//! Every failure the dispatcher can hit, with the HTTP status and plain-text
//! body sent back to the gateway. The status decides whether EuPago redelivers:
//! 2xx and 4xx stop redelivery, 5xx asks for it.

use axum::http::StatusCode;
use thiserror::Error;

use super::DecryptionFailure;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// POST body is not valid UTF-8.
    #[error("Invalid body encoding")]
    InvalidEncoding,

    /// URL tenant segment is not a valid organizer key.
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    /// Structured body without a usable transaction object.
    #[error("Missing transaction data")]
    MissingTransactionData,

    /// Transaction carries neither identifier nor reference.
    #[error("Missing identifier and reference")]
    MissingIdentifiers,

    /// Legacy notification lacks required parameters.
    #[error("Missing parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    /// HMAC signature did not match.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Encrypted body could not be decrypted with any candidate.
    #[error("Decryption failed: {0}")]
    Decryption(#[from] DecryptionFailure),

    /// Encrypted body received but the tenant has no secret.
    #[error("Encrypted webhooks require a configured secret")]
    EncryptionNotConfigured,

    /// No local payment matches; acknowledged so the gateway stops retrying.
    #[error("Payment not found")]
    PaymentNotFound,

    /// Settings could not be read.
    #[error("Settings error: {0}")]
    Settings(String),

    /// Persistence failed during reconciliation.
    #[error("Processing error: {0}")]
    Processing(String),
}

impl WebhookError {
    /// Returns true if the gateway should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Settings(_) | WebhookError::Processing(_))
    }

    /// Maps the error to the HTTP status returned to the gateway.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidEncoding
            | WebhookError::InvalidTenant(_)
            | WebhookError::MissingTransactionData
            | WebhookError::MissingIdentifiers
            | WebhookError::MissingParameters(_)
            | WebhookError::InvalidSignature
            | WebhookError::Decryption(_) => StatusCode::BAD_REQUEST,

            WebhookError::EncryptionNotConfigured => StatusCode::NOT_IMPLEMENTED,

            // Soft-fail: acknowledged
            WebhookError::PaymentNotFound => StatusCode::OK,

            WebhookError::Settings(_) | WebhookError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Plain-text body sent with the status.
    ///
    /// Server-side details stay in the logs.
    pub fn response_body(&self) -> String {
        match self {
            WebhookError::Decryption(_) => "Decryption failed".to_string(),
            WebhookError::InvalidTenant(_) => "Invalid tenant".to_string(),
            WebhookError::Settings(_) => "Internal error".to_string(),
            WebhookError::Processing(_) => "Processing error".to_string(),
            other => other.to_string(),
        }
    }
}
