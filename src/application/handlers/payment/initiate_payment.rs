//! InitiatePaymentHandler - Registers a created payment with EuPago.
//!
//! Sends the payment to the gateway with the organizer's credentials, stores
//! the gateway response in the payment info and moves it to `Pending`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::application::settings::SettingsResolver;
use crate::domain::foundation::{PaymentId, TenantKey};
use crate::domain::payment::{PaymentMethod, PaymentState};
use crate::ports::{
    CallbackUrls, CasResult, CreatePaymentRequest, GatewayCredentials, GatewayPayment,
    PaymentGateway, PaymentRepository,
};

use super::PaymentFlowError;

/// Command to initiate a payment at the gateway.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub tenant: TenantKey,
    pub payment_id: PaymentId,
    /// MB WAY only.
    pub customer_phone: Option<String>,
    /// Card only.
    pub channel: Option<String>,
    pub urls: CallbackUrls,
}

/// Result of a successful initiation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiatePaymentResult {
    pub payment_id: PaymentId,
    pub state: PaymentState,
    pub redirect_url: Option<String>,
    pub reference: Option<String>,
}

pub struct InitiatePaymentHandler {
    repository: Arc<dyn PaymentRepository>,
    settings: Arc<SettingsResolver>,
    gateway: Arc<dyn PaymentGateway>,
}

impl InitiatePaymentHandler {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        settings: Arc<SettingsResolver>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            repository,
            settings,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiatePaymentCommand,
    ) -> Result<InitiatePaymentResult, PaymentFlowError> {
        let payment = self
            .repository
            .find_by_id(&cmd.tenant, &cmd.payment_id)
            .await?
            .ok_or(PaymentFlowError::NotFound)?;

        let method = PaymentMethod::from_provider_id(&payment.provider)
            .ok_or_else(|| PaymentFlowError::UnsupportedMethod(payment.provider.clone()))?;

        if payment.state != PaymentState::Created {
            return Err(PaymentFlowError::InvalidState(payment.state));
        }

        let api_key = self
            .settings
            .api_key(&cmd.tenant)
            .await?
            .ok_or(PaymentFlowError::MissingApiKey)?;
        let base_url = self.settings.base_url(&cmd.tenant).await?;
        let description = self.settings.method_description(&cmd.tenant, method).await?;

        let request = CreatePaymentRequest {
            method,
            identifier: payment.identifier().to_string(),
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            description: Some(description),
            customer_phone: cmd.customer_phone,
            channel: cmd.channel,
            urls: cmd.urls,
        };

        let created = self
            .gateway
            .create_payment(&GatewayCredentials::from_secret(api_key, base_url), request)
            .await
            .map_err(|e| {
                tracing::warn!(
                    payment_id = %payment.id,
                    method = method.provider_id(),
                    code = %e.code,
                    retryable = e.retryable,
                    "EuPago payment creation failed"
                );
                e
            })?;

        let mut next = payment.clone();
        next.merge_info(&created.response);
        next.merge_info(&gateway_summary(method, &created));

        let stored = match self
            .repository
            .compare_and_set(&payment.id, PaymentState::Created, PaymentState::Pending, next.info)
            .await?
        {
            CasResult::Applied(stored) => stored,
            CasResult::Conflict(latest) => {
                tracing::warn!(
                    payment_id = %latest.id,
                    state = %latest.state,
                    "Payment changed during initiation"
                );
                latest
            }
        };

        tracing::info!(
            payment_id = %stored.id,
            method = method.provider_id(),
            reference = ?created.reference,
            "EuPago payment initiated"
        );

        Ok(InitiatePaymentResult {
            payment_id: stored.id,
            state: stored.state,
            redirect_url: created.redirect_url,
            reference: created.reference,
        })
    }
}

fn gateway_summary(method: PaymentMethod, created: &GatewayPayment) -> Value {
    json!({
        "method": method.provider_id(),
        "eupago_redirect_url": created.redirect_url,
        "eupago_reference": created.reference,
        "eupago_transaction_id": created.transaction_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPaymentRepository, InMemorySettingsStore};
    use crate::config::GatewayConfig;
    use crate::domain::payment::Payment;
    use crate::ports::{PaymentError, PaymentErrorCode};
    use async_trait::async_trait;
    use secrecy::ExposeSecret;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct MockGateway {
        requests: Mutex<Vec<(String, String, CreatePaymentRequest)>>,
        fail: Option<PaymentError>,
    }

    impl MockGateway {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail: None,
            }
        }

        fn failing(error: PaymentError) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail: Some(error),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_payment(
            &self,
            credentials: &GatewayCredentials,
            request: CreatePaymentRequest,
        ) -> Result<GatewayPayment, PaymentError> {
            self.requests.lock().unwrap().push((
                credentials.api_key.expose_secret().clone(),
                credentials.base_url.clone(),
                request.clone(),
            ));
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            Ok(GatewayPayment {
                redirect_url: None,
                reference: Some("217404".to_string()),
                transaction_id: Some("TRX-1".to_string()),
                response: json!({"sucesso": true, "referencia": "217404", "entidade": "11249"}),
            })
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn tenant() -> TenantKey {
        TenantKey::new("festival").unwrap()
    }

    struct Fixture {
        repo: InMemoryPaymentRepository,
        settings: InMemorySettingsStore,
        gateway: Arc<MockGateway>,
        handler: InitiatePaymentHandler,
    }

    async fn fixture(payment: &Payment, gateway: MockGateway) -> Fixture {
        let repo = InMemoryPaymentRepository::with_payments([payment.clone()]).await;
        let settings = InMemorySettingsStore::new();
        let gateway = Arc::new(gateway);
        let resolver = Arc::new(SettingsResolver::new(
            Arc::new(settings.clone()),
            &GatewayConfig::default(),
        ));
        Fixture {
            handler: InitiatePaymentHandler::new(Arc::new(repo.clone()), resolver, gateway.clone()),
            repo,
            settings,
            gateway,
        }
    }

    fn multibanco() -> Payment {
        Payment::new(tenant(), "ORD9", 2, "eupago_multibanco", 4550, "EUR")
    }

    fn command(payment: &Payment) -> InitiatePaymentCommand {
        InitiatePaymentCommand {
            tenant: tenant(),
            payment_id: payment.id,
            customer_phone: None,
            channel: None,
            urls: CallbackUrls {
                webhook: "https://tickets.example/webhooks/eupago/festival".to_string(),
                ..Default::default()
            },
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn initiation_stores_reference_and_moves_to_pending() {
        let p = multibanco();
        let fx = fixture(&p, MockGateway::new()).await;
        fx.settings.set(&tenant(), "payment_eupago_api_key", "demo-key").await;

        let result = fx.handler.handle(command(&p)).await.unwrap();

        assert_eq!(result.state, PaymentState::Pending);
        assert_eq!(result.reference.as_deref(), Some("217404"));
        let stored = fx.repo.get(&p.id).await.unwrap();
        assert_eq!(stored.info["referencia"], "217404");
        assert_eq!(stored.info["eupago_reference"], "217404");
        assert_eq!(stored.info["method"], "eupago_multibanco");
    }

    #[tokio::test]
    async fn request_carries_identifier_amount_and_organizer_settings() {
        let p = multibanco();
        let fx = fixture(&p, MockGateway::new()).await;
        fx.settings.set(&tenant(), "eupago_api_key", "demo-key").await;
        fx.settings.set(&tenant(), "eupago_endpoint", "live").await;

        fx.handler.handle(command(&p)).await.unwrap();

        let requests = fx.gateway.requests.lock().unwrap();
        let (key, base_url, request) = &requests[0];
        assert_eq!(key, "demo-key");
        assert_eq!(base_url, "https://clientes.eupago.pt");
        assert_eq!(request.identifier, "ORD9-P-2");
        assert_eq!(request.amount_cents, 4550);
        assert_eq!(request.method, PaymentMethod::Multibanco);
        assert_eq!(
            request.description.as_deref(),
            Some(PaymentMethod::Multibanco.default_description())
        );
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_calling_gateway() {
        let p = multibanco();
        let fx = fixture(&p, MockGateway::new()).await;

        let err = fx.handler.handle(command(&p)).await.unwrap_err();

        assert!(matches!(err, PaymentFlowError::MissingApiKey));
        assert!(fx.gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_error_leaves_payment_created() {
        let p = multibanco();
        let error = PaymentError::new(PaymentErrorCode::AuthenticationError, "denied").with_http_status(401);
        let fx = fixture(&p, MockGateway::failing(error)).await;
        fx.settings.set(&tenant(), "eupago_api_key", "bad-key").await;

        let err = fx.handler.handle(command(&p)).await.unwrap_err();

        assert!(matches!(err, PaymentFlowError::Gateway(ref e) if e.http_status == Some(401)));
        assert_eq!(fx.repo.get(&p.id).await.unwrap().state, PaymentState::Created);
    }

    #[tokio::test]
    async fn already_pending_payment_is_rejected() {
        let p = multibanco().with_state(PaymentState::Pending);
        let fx = fixture(&p, MockGateway::new()).await;
        fx.settings.set(&tenant(), "eupago_api_key", "demo-key").await;

        let err = fx.handler.handle(command(&p)).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::InvalidState(PaymentState::Pending)));
    }

    #[tokio::test]
    async fn foreign_provider_is_unsupported() {
        let p = Payment::new(tenant(), "ORD9", 2, "eupago_bizum", 4550, "EUR");
        let fx = fixture(&p, MockGateway::new()).await;

        let err = fx.handler.handle(command(&p)).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::UnsupportedMethod(_)));
    }
}
