//! Errors of the payment command handlers outside the webhook pipeline.

use thiserror::Error;

use crate::domain::payment::PaymentState;
use crate::ports::{PaymentError, RepositoryError, SettingsError};

use super::ReconcileError;

#[derive(Debug, Error)]
pub enum PaymentFlowError {
    /// Unknown payment, or one that belongs to another organizer, order or
    /// provider family.
    #[error("Payment not found")]
    NotFound,

    #[error("Debug mode is not enabled for this organizer")]
    DebugModeRequired,

    #[error("EuPago API key is not configured")]
    MissingApiKey,

    #[error("Payment provider {0} is not an EuPago method")]
    UnsupportedMethod(String),

    #[error("Payment cannot be initiated from state {0}")]
    InvalidState(PaymentState),

    #[error(transparent)]
    Gateway(#[from] PaymentError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}
