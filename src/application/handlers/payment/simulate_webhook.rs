//! SimulateWebhookHandler - Feeds a synthetic notification through reconciliation.
//!
//! Diagnostics for organizers testing their setup in sandbox. Allowed only
//! while the organizer has debug mode on.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::application::settings::SettingsResolver;
use crate::domain::foundation::{PaymentId, TenantKey};
use crate::domain::payment::{Outcome, Payment, PaymentState};
use crate::ports::PaymentRepository;

use super::{PaymentFlowError, ReconcilePaymentCommand, ReconcilePaymentHandler};

/// Command to simulate a webhook for one payment.
#[derive(Debug, Clone)]
pub struct SimulateWebhookCommand {
    pub tenant: TenantKey,
    pub payment_id: PaymentId,
    /// Gateway status token, e.g. `paid` or `Falhado`.
    pub status: String,
}

/// Result of a simulated webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulateWebhookResult {
    pub payment_id: PaymentId,
    pub outcome: Outcome,
    pub state: PaymentState,
    pub state_changed: bool,
    pub transaction: Value,
}

pub struct SimulateWebhookHandler {
    repository: Arc<dyn PaymentRepository>,
    settings: Arc<SettingsResolver>,
    reconciler: Arc<ReconcilePaymentHandler>,
}

impl SimulateWebhookHandler {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        settings: Arc<SettingsResolver>,
        reconciler: Arc<ReconcilePaymentHandler>,
    ) -> Self {
        Self {
            repository,
            settings,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: SimulateWebhookCommand,
    ) -> Result<SimulateWebhookResult, PaymentFlowError> {
        if !self.settings.debug_mode(&cmd.tenant).await? {
            return Err(PaymentFlowError::DebugModeRequired);
        }

        let payment = self
            .repository
            .find_by_id(&cmd.tenant, &cmd.payment_id)
            .await?
            .filter(Payment::is_gateway_payment)
            .ok_or(PaymentFlowError::NotFound)?;

        let transaction = synthetic_transaction(&payment, &cmd.status);
        let outcome = Outcome::from_transaction(&transaction);
        tracing::info!(
            payment_id = %payment.id,
            status = %cmd.status,
            outcome = outcome.as_str(),
            "Simulating EuPago webhook"
        );

        let result = self
            .reconciler
            .handle(ReconcilePaymentCommand {
                payment,
                outcome,
                payload: transaction.clone(),
            })
            .await?;

        Ok(SimulateWebhookResult {
            payment_id: result.payment().id,
            outcome,
            state: result.payment().state,
            state_changed: result.state_changed(),
            transaction,
        })
    }
}

fn synthetic_transaction(payment: &Payment, status: &str) -> Value {
    json!({
        "identifier": payment.identifier().to_string(),
        "reference": format!("SIM-{}", payment.local_id),
        "status": status,
        "amount": {
            "value": payment.amount_decimal(),
            "currency": payment.currency,
        },
        "simulated": true,
    })
}
