//! HandleWebhookHandler - Command handler for EuPago payment notifications.
//!
//! Pipeline: detect format, decrypt, verify signature, locate the payment,
//! map the status, reconcile. Each failure becomes a `WebhookError` carrying
//! the HTTP status returned to the gateway.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::application::settings::{SettingsResolver, WebhookSecret};
use crate::domain::foundation::{PaymentId, TenantKey};
use crate::domain::payment::{status_token, Outcome, Payment, PaymentState};
use crate::domain::webhook::{
    decrypt_with_candidate, detect_format, encrypted_data, DecryptionFailure, LegacyParams,
    Notification, SignatureVerifier, TransactionNotice, WebhookEnvelope, WebhookError,
};

use super::{PaymentLocator, ReconcilePaymentCommand, ReconcilePaymentHandler};

/// Command to process one inbound webhook request.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Organizer slug from the URL.
    pub tenant: String,
    pub envelope: WebhookEnvelope,
}

/// Result of a processed webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandleWebhookResult {
    pub payment_id: PaymentId,
    pub version: &'static str,
    pub outcome: Outcome,
    pub state: PaymentState,
    pub state_changed: bool,
}

/// Handler for inbound EuPago webhooks.
pub struct HandleWebhookHandler {
    settings: Arc<SettingsResolver>,
    locator: Arc<PaymentLocator>,
    reconciler: Arc<ReconcilePaymentHandler>,
}

impl HandleWebhookHandler {
    pub fn new(
        settings: Arc<SettingsResolver>,
        locator: Arc<PaymentLocator>,
        reconciler: Arc<ReconcilePaymentHandler>,
    ) -> Self {
        Self {
            settings,
            locator,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleWebhookCommand,
    ) -> Result<HandleWebhookResult, WebhookError> {
        let tenant =
            TenantKey::new(cmd.tenant.as_str()).map_err(|_| WebhookError::InvalidTenant(cmd.tenant))?;

        let notification = detect_format(&cmd.envelope)?;
        tracing::info!(
            tenant = %tenant,
            version = notification.version(),
            method = %cmd.envelope.method,
            "EuPago webhook received"
        );

        match notification {
            Notification::Structured(body) => {
                self.handle_structured(&tenant, &cmd.envelope, body).await
            }
            Notification::Legacy(params) => self.handle_legacy(&tenant, params).await,
        }
    }

    async fn handle_structured(
        &self,
        tenant: &TenantKey,
        envelope: &WebhookEnvelope,
        body: Value,
    ) -> Result<HandleWebhookResult, WebhookError> {
        let secret = self
            .settings
            .webhook_secret(tenant)
            .await
            .map_err(|e| WebhookError::Settings(e.to_string()))?;

        let body = match encrypted_data(&body) {
            Some(data) => self.decrypt(envelope, data, secret.as_ref())?,
            None => body,
        };

        let notice = TransactionNotice::from_body(&body)?;
        self.check_signature(tenant, envelope, secret.as_ref()).await?;

        let payment = self
            .locator
            .find(tenant, notice.identifier.as_deref(), notice.reference.as_deref())
            .await
            .map_err(|e| WebhookError::Processing(e.to_string()))?
            .ok_or_else(|| {
                tracing::warn!(
                    tenant = %tenant,
                    identifier = ?notice.identifier,
                    reference = ?notice.reference,
                    "No payment matches webhook"
                );
                WebhookError::PaymentNotFound
            })?;

        let outcome = Outcome::from_transaction(&notice.transaction);
        if outcome == Outcome::Unknown {
            tracing::warn!(
                payment_id = %payment.id,
                status = ?status_token(&notice.transaction),
                "Unrecognised webhook status, recording payload only"
            );
        }

        self.reconcile("v2", payment, outcome, notice.transaction).await
    }

    async fn handle_legacy(
        &self,
        tenant: &TenantKey,
        params: LegacyParams,
    ) -> Result<HandleWebhookResult, WebhookError> {
        let notice = params.into_notice()?;

        let payment = self
            .locator
            .find(tenant, Some(&notice.identifier), Some(&notice.reference))
            .await
            .map_err(|e| WebhookError::Processing(e.to_string()))?
            .ok_or_else(|| {
                tracing::warn!(
                    tenant = %tenant,
                    identifier = %notice.identifier,
                    reference = %notice.reference,
                    "No payment matches legacy webhook"
                );
                WebhookError::PaymentNotFound
            })?;

        tracing::debug!(payment_id = %payment.id, amount = %notice.amount, "Legacy webhook matched");

        // v1 notifications are only sent for paid transactions
        self.reconcile("v1", payment, Outcome::Completed, notice.payload)
            .await
    }

    fn decrypt(
        &self,
        envelope: &WebhookEnvelope,
        data: &str,
        secret: Option<&WebhookSecret>,
    ) -> Result<Value, WebhookError> {
        let secret = secret.ok_or(WebhookError::EncryptionNotConfigured)?;

        let (plaintext, candidate) =
            decrypt_with_candidate(data, envelope.iv.as_deref(), secret.expose()).map_err(|e| {
                tracing::warn!(error = %e, "Webhook decryption failed");
                e
            })?;
        tracing::debug!(candidate = %candidate, "Webhook payload decrypted");

        serde_json::from_str(&plaintext)
            .map_err(|_| WebhookError::Decryption(DecryptionFailure::Exhausted))
    }

    /// Checks `X-Signature` when the gateway sent one. Debug mode lets a
    /// failed check through with a warning.
    async fn check_signature(
        &self,
        tenant: &TenantKey,
        envelope: &WebhookEnvelope,
        secret: Option<&WebhookSecret>,
    ) -> Result<(), WebhookError> {
        let Some(header) = envelope.signature.as_deref().filter(|h| !h.trim().is_empty()) else {
            return Ok(());
        };

        let verifier = SignatureVerifier::new(secret.map(WebhookSecret::expose).unwrap_or_default());
        let verdict = verifier.verify(&envelope.body, Some(header));
        if verdict.is_accepted() {
            return Ok(());
        }

        let debug = self
            .settings
            .debug_mode(tenant)
            .await
            .map_err(|e| WebhookError::Settings(e.to_string()))?;

        if debug {
            tracing::warn!(
                tenant = %tenant,
                verdict = ?verdict,
                expected = ?verifier.sign_base64(&envelope.body),
                "Invalid webhook signature accepted in debug mode"
            );
            return Ok(());
        }

        tracing::warn!(tenant = %tenant, verdict = ?verdict, "Invalid webhook signature");
        Err(WebhookError::InvalidSignature)
    }

    async fn reconcile(
        &self,
        version: &'static str,
        payment: Payment,
        outcome: Outcome,
        payload: Value,
    ) -> Result<HandleWebhookResult, WebhookError> {
        let result = self
            .reconciler
            .handle(ReconcilePaymentCommand {
                payment,
                outcome,
                payload,
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Webhook reconciliation failed");
                WebhookError::Processing(e.to_string())
            })?;

        let payment = result.payment();
        Ok(HandleWebhookResult {
            payment_id: payment.id,
            version,
            outcome,
            state: payment.state,
            state_changed: result.state_changed(),
        })
    }
}
