//! HandleReturnHandler - Customer returning from the gateway's hosted page.
//!
//! The return URL is user-controlled, so it never confirms a payment. It only
//! records that the customer came back, or abandons a payment the customer
//! walked away from.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::foundation::{PaymentId, TenantKey, Timestamp};
use crate::domain::payment::{Payment, PaymentState};
use crate::ports::{CasResult, PaymentRepository};

use super::PaymentFlowError;

/// Which return URL the customer hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnStatus {
    Success,
    Fail,
    Back,
    Other(String),
}

impl ReturnStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "success" => ReturnStatus::Success,
            "fail" => ReturnStatus::Fail,
            "back" => ReturnStatus::Back,
            other => ReturnStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnStatus::Success => f.write_str("success"),
            ReturnStatus::Fail => f.write_str("fail"),
            ReturnStatus::Back => f.write_str("back"),
            ReturnStatus::Other(other) => f.write_str(other),
        }
    }
}

/// Where the storefront should send the customer next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectKind {
    /// Order detail page.
    Order,
    /// Payment method selection, to try again.
    Retry,
}

/// Command for a return-URL hit.
#[derive(Debug, Clone)]
pub struct HandleReturnCommand {
    pub tenant: TenantKey,
    pub order_code: String,
    pub payment_id: PaymentId,
    pub status: ReturnStatus,
}

/// Result of a return-URL hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandleReturnResult {
    pub payment_id: PaymentId,
    pub order_code: String,
    /// `confirmed`, `processing`, `failed`, `cancelled` or the current state.
    pub outcome: String,
    pub state: PaymentState,
    pub redirect: RedirectKind,
}

/// Handler for return-URL requests.
pub struct HandleReturnHandler {
    repository: Arc<dyn PaymentRepository>,
}

impl HandleReturnHandler {
    pub fn new(repository: Arc<dyn PaymentRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        cmd: HandleReturnCommand,
    ) -> Result<HandleReturnResult, PaymentFlowError> {
        let payment = self
            .repository
            .find_by_id(&cmd.tenant, &cmd.payment_id)
            .await?
            .filter(|p| p.order_code == cmd.order_code && p.is_gateway_payment())
            .ok_or(PaymentFlowError::NotFound)?;

        tracing::info!(
            payment_id = %payment.id,
            status = %cmd.status,
            state = %payment.state,
            "Customer returned from gateway"
        );

        match cmd.status {
            ReturnStatus::Success => self.on_success(payment).await,
            ReturnStatus::Fail => self.on_fail(payment).await,
            ReturnStatus::Back => self.on_back(payment).await,
            ReturnStatus::Other(_) => Ok(report(&payment, payment.state.as_str(), RedirectKind::Order)),
        }
    }

    async fn on_success(&self, payment: Payment) -> Result<HandleReturnResult, PaymentFlowError> {
        if payment.state == PaymentState::Confirmed {
            return Ok(report(&payment, "confirmed", RedirectKind::Order));
        }

        // Confirmation only ever comes from the webhook
        let marks = json!({
            "success_url_returned": true,
            "success_url_returned_at": Timestamp::now().to_rfc3339(),
        });
        let payment = self.write(payment.clone(), payment.state, &marks).await?;
        let outcome = if payment.state == PaymentState::Confirmed {
            "confirmed"
        } else {
            "processing"
        };
        Ok(report(&payment, outcome, RedirectKind::Order))
    }

    async fn on_fail(&self, payment: Payment) -> Result<HandleReturnResult, PaymentFlowError> {
        if payment.state.is_unsuccessful() || payment.state.is_settled() {
            return Ok(report(&payment, payment.state.as_str(), RedirectKind::Retry));
        }

        let reason = json!({ "reason": "User returned from fail URL" });
        let payment = self.write(payment, PaymentState::Failed, &reason).await?;
        Ok(report(&payment, "failed", RedirectKind::Retry))
    }

    async fn on_back(&self, payment: Payment) -> Result<HandleReturnResult, PaymentFlowError> {
        if payment.state != PaymentState::Pending {
            return Ok(report(&payment, payment.state.as_str(), RedirectKind::Order));
        }

        let payment = self.write(payment, PaymentState::Canceled, &Value::Null).await?;
        Ok(report(&payment, "cancelled", RedirectKind::Order))
    }

    /// Guarded write. When a webhook changed the payment first, its state is
    /// kept and reported.
    async fn write(
        &self,
        payment: Payment,
        target: PaymentState,
        marks: &Value,
    ) -> Result<Payment, PaymentFlowError> {
        let mut next = payment.clone();
        next.merge_info(marks);

        match self
            .repository
            .compare_and_set(&payment.id, payment.state, target, next.info)
            .await?
        {
            CasResult::Applied(stored) => Ok(stored),
            CasResult::Conflict(latest) => {
                tracing::info!(
                    payment_id = %latest.id,
                    state = %latest.state,
                    "Payment changed while customer returned, keeping webhook state"
                );
                Ok(latest)
            }
        }
    }
}

fn report(payment: &Payment, outcome: &str, redirect: RedirectKind) -> HandleReturnResult {
    HandleReturnResult {
        payment_id: payment.id,
        order_code: payment.order_code.clone(),
        outcome: outcome.to_string(),
        state: payment.state,
        redirect,
    }
}
