//! HTTP handlers for EuPago endpoints.
//!
//! These handlers connect Axum routes to the payment command handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, RawQuery, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::application::handlers::payment::{
    HandleReturnCommand, HandleReturnHandler, HandleWebhookCommand, HandleWebhookHandler,
    InitiatePaymentCommand, InitiatePaymentHandler, PaymentFlowError, PaymentLocator,
    ReconcilePaymentHandler, ReturnStatus, SimulateWebhookCommand, SimulateWebhookHandler,
};
use crate::application::SettingsResolver;
use crate::domain::foundation::{PaymentId, TenantKey};
use crate::domain::webhook::{WebhookEnvelope, WebhookError, IV_HEADER, SIGNATURE_HEADER};
use crate::ports::{CallbackUrls, OrderFulfillment, PaymentGateway, PaymentRepository};

use super::dto::{
    ErrorResponse, InitiatePaymentRequest, InitiatePaymentResponse, ReturnResponse,
    SimulateWebhookRequest, SimulateWebhookResponse,
};

/// Body of the health endpoint.
pub const HEALTH_BODY: &str = "Webhook endpoint is working!";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; handlers are built on demand from the
/// Arc-wrapped ports.
#[derive(Clone)]
pub struct EuPagoAppState {
    pub payment_repository: Arc<dyn PaymentRepository>,
    pub settings: Arc<SettingsResolver>,
    pub fulfillment: Arc<dyn OrderFulfillment>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Newest payments searched by the info scan.
    pub scan_limit: usize,
    /// Bounded compare-and-set attempts per reconciliation.
    pub reconcile_attempts: u32,
    /// Externally reachable origin used for callback URLs, without trailing slash.
    pub public_url: String,
    /// Bearer token accepted on the admin routes. `None` locks them.
    pub admin_token: Option<SecretString>,
}

impl EuPagoAppState {
    pub fn reconcile_handler(&self) -> Arc<ReconcilePaymentHandler> {
        Arc::new(ReconcilePaymentHandler::new(
            self.payment_repository.clone(),
            self.fulfillment.clone(),
            self.reconcile_attempts,
        ))
    }

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        HandleWebhookHandler::new(
            self.settings.clone(),
            Arc::new(PaymentLocator::new(
                self.payment_repository.clone(),
                self.scan_limit,
            )),
            self.reconcile_handler(),
        )
    }

    pub fn return_handler(&self) -> HandleReturnHandler {
        HandleReturnHandler::new(self.payment_repository.clone())
    }

    pub fn simulate_handler(&self) -> SimulateWebhookHandler {
        SimulateWebhookHandler::new(
            self.payment_repository.clone(),
            self.settings.clone(),
            self.reconcile_handler(),
        )
    }

    pub fn initiate_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(
            self.payment_repository.clone(),
            self.settings.clone(),
            self.gateway.clone(),
        )
    }

    /// URLs handed to the gateway for one payment.
    pub fn callback_urls(&self, tenant: &TenantKey, order_code: &str, id: &PaymentId) -> CallbackUrls {
        let base = self.public_url.trim_end_matches('/');
        let return_base = format!("{}/return/{}/{}/{}", base, tenant, order_code, id);
        CallbackUrls {
            webhook: format!("{}/webhooks/eupago/{}", base, tenant),
            success: format!("{}/success", return_base),
            fail: format!("{}/fail", return_base),
            back: format!("{}/back", return_base),
            return_base,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Authentication
// ════════════════════════════════════════════════════════════════════════════════

/// Proof that the request carried the configured admin bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

/// Rejection type for AdminAccess extraction.
pub struct AdminAuthenticationRequired;

impl IntoResponse for AdminAuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(error),
        )
            .into_response()
    }
}

impl axum::extract::FromRequestParts<EuPagoAppState> for AdminAccess {
    type Rejection = AdminAuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        state: &'life1 EuPagoAppState,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let Some(expected) = &state.admin_token else {
                tracing::warn!("Admin request refused, no admin token configured");
                return Err(AdminAuthenticationRequired);
            };

            let presented = parts
                .headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or(AdminAuthenticationRequired)?;

            if bool::from(presented.as_bytes().ct_eq(expected.expose_secret().as_bytes())) {
                Ok(AdminAccess)
            } else {
                tracing::warn!("Admin request refused, bad bearer token");
                Err(AdminAuthenticationRequired)
            }
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handlers (gateway-facing, plain text)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /webhooks/eupago/health - Liveness check for the webhook endpoint
pub async fn webhook_health() -> impl IntoResponse {
    (StatusCode::OK, HEALTH_BODY)
}

/// GET|POST /webhooks/eupago/:tenant - Receive an EuPago notification
///
/// Always answers in plain text; the status tells the gateway whether to
/// redeliver.
pub async fn receive_webhook(
    State(state): State<EuPagoAppState>,
    Path(tenant): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let envelope = WebhookEnvelope {
        method,
        content_type: header_value(header::CONTENT_TYPE.as_str()),
        query,
        body: body.to_vec(),
        signature: header_value(SIGNATURE_HEADER),
        iv: header_value(IV_HEADER),
    };

    let handler = state.webhook_handler();
    match handler.handle(HandleWebhookCommand { tenant, envelope }).await {
        Ok(result) => {
            tracing::debug!(
                payment_id = %result.payment_id,
                state = %result.state,
                state_changed = result.state_changed,
                "EuPago webhook acknowledged"
            );
            (StatusCode::OK, "OK").into_response()
        }
        Err(err) => WebhookResponseError(err).into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Customer Return Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /return/:tenant/:order/:payment_id/:status - Customer back from the gateway
pub async fn customer_return(
    State(state): State<EuPagoAppState>,
    Path((tenant, order_code, payment_id, status)): Path<(String, String, String, String)>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = HandleReturnCommand {
        tenant: parse_tenant(&tenant)?,
        order_code,
        payment_id: parse_payment_id(&payment_id)?,
        status: ReturnStatus::parse(&status),
    };

    let result = state.return_handler().handle(cmd).await?;
    Ok(Json(ReturnResponse::from(result)))
}

/// GET /return/:tenant/:order/:payment_id - Card return URL without a status
pub async fn customer_return_base(
    State(state): State<EuPagoAppState>,
    Path((tenant, order_code, payment_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = HandleReturnCommand {
        tenant: parse_tenant(&tenant)?,
        order_code,
        payment_id: parse_payment_id(&payment_id)?,
        status: ReturnStatus::Other(String::new()),
    };

    let result = state.return_handler().handle(cmd).await?;
    Ok(Json(ReturnResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /admin/:tenant/payments/:id/simulate - Simulate a webhook (debug mode only)
pub async fn simulate_webhook(
    State(state): State<EuPagoAppState>,
    _admin: AdminAccess,
    Path((tenant, payment_id)): Path<(String, String)>,
    Json(request): Json<SimulateWebhookRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = SimulateWebhookCommand {
        tenant: parse_tenant(&tenant)?,
        payment_id: parse_payment_id(&payment_id)?,
        status: request.status,
    };

    let result = state.simulate_handler().handle(cmd).await?;
    Ok(Json(SimulateWebhookResponse::from(result)))
}

/// POST /admin/:tenant/payments/:id/initiate - Register a payment with EuPago
pub async fn initiate_payment(
    State(state): State<EuPagoAppState>,
    _admin: AdminAccess,
    Path((tenant, payment_id)): Path<(String, String)>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let tenant = parse_tenant(&tenant)?;
    let payment_id = parse_payment_id(&payment_id)?;

    let payment = state
        .payment_repository
        .find_by_id(&tenant, &payment_id)
        .await
        .map_err(PaymentFlowError::from)?
        .ok_or(PaymentFlowError::NotFound)?;

    let cmd = InitiatePaymentCommand {
        urls: state.callback_urls(&tenant, &payment.order_code, &payment_id),
        tenant,
        payment_id,
        customer_phone: request.customer_phone,
        channel: request.channel,
    };

    let result = state.initiate_handler().handle(cmd).await?;
    Ok((StatusCode::CREATED, Json(InitiatePaymentResponse::from(result))))
}

fn parse_tenant(raw: &str) -> Result<TenantKey, PaymentApiError> {
    TenantKey::new(raw).map_err(|_| PaymentApiError(PaymentFlowError::NotFound))
}

fn parse_payment_id(raw: &str) -> Result<PaymentId, PaymentApiError> {
    raw.parse()
        .map_err(|_| PaymentApiError(PaymentFlowError::NotFound))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Plain-text webhook failure sent back to the gateway.
pub struct WebhookResponseError(pub WebhookError);

impl IntoResponse for WebhookResponseError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if self.0.is_retryable() {
            tracing::error!(error = %self.0, status = status.as_u16(), "EuPago webhook failed");
        } else {
            tracing::warn!(error = %self.0, status = status.as_u16(), "EuPago webhook rejected");
        }
        (status, self.0.response_body()).into_response()
    }
}

/// API error type that converts payment flow errors to HTTP responses.
pub struct PaymentApiError(PaymentFlowError);

impl From<PaymentFlowError> for PaymentApiError {
    fn from(err: PaymentFlowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            PaymentFlowError::NotFound => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
            PaymentFlowError::DebugModeRequired => (StatusCode::FORBIDDEN, "DEBUG_MODE_REQUIRED"),
            PaymentFlowError::MissingApiKey => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EUPAGO_NOT_CONFIGURED")
            }
            PaymentFlowError::UnsupportedMethod(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNSUPPORTED_METHOD")
            }
            PaymentFlowError::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION"),
            PaymentFlowError::Gateway(e) if e.retryable => {
                (StatusCode::SERVICE_UNAVAILABLE, "GATEWAY_UNAVAILABLE")
            }
            PaymentFlowError::Gateway(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            PaymentFlowError::Repository(_)
            | PaymentFlowError::Settings(_)
            | PaymentFlowError::Reconcile(_) => {
                tracing::error!(error = %self.0, "Payment request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self.0 {
            PaymentFlowError::Gateway(e) => e.message.clone(),
            PaymentFlowError::Repository(_)
            | PaymentFlowError::Settings(_)
            | PaymentFlowError::Reconcile(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}
