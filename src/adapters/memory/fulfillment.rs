//! Fulfillment adapters that record or log confirmations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::PaymentId;
use crate::domain::payment::Payment;
use crate::ports::{FulfillmentError, OrderFulfillment};

/// Records every confirmation. Used by tests to assert exactly-once delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingFulfillment {
    confirmed: Arc<Mutex<Vec<PaymentId>>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingFulfillment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fulfillment that records and then fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// A fulfillment that takes `delay` before recording.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn confirmed(&self) -> Vec<PaymentId> {
        self.confirmed
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    pub fn count_for(&self, id: &PaymentId) -> usize {
        self.confirmed().iter().filter(|c| *c == id).count()
    }
}

#[async_trait]
impl OrderFulfillment for RecordingFulfillment {
    async fn payment_confirmed(&self, payment: &Payment) -> Result<(), FulfillmentError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut ids) = self.confirmed.lock() {
            ids.push(payment.id);
        }
        if self.fail {
            return Err(FulfillmentError("order mailer unavailable".to_string()));
        }
        Ok(())
    }
}

/// Logs confirmations. Used when the service runs without a host.
#[derive(Debug, Clone, Default)]
pub struct LoggingFulfillment;

#[async_trait]
impl OrderFulfillment for LoggingFulfillment {
    async fn payment_confirmed(&self, payment: &Payment) -> Result<(), FulfillmentError> {
        tracing::info!(
            payment_id = %payment.id,
            tenant = %payment.tenant,
            identifier = %payment.identifier(),
            amount = %payment.amount_decimal(),
            "Payment confirmed, order ready for fulfillment"
        );
        Ok(())
    }
}
