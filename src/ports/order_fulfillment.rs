//! Order fulfillment port.
//!
//! The host's side effects of a confirmed payment: marking the order paid,
//! issuing tickets, sending mail. Called once per payment, right after the
//! write that moved it into `Confirmed`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::payment::Payment;

#[derive(Debug, Clone, Error)]
#[error("Fulfillment failed: {0}")]
pub struct FulfillmentError(pub String);

#[async_trait]
pub trait OrderFulfillment: Send + Sync {
    /// `payment` has just been confirmed.
    async fn payment_confirmed(&self, payment: &Payment) -> Result<(), FulfillmentError>;
}
