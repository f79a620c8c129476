//! Payment command handlers.
//!
//! - `HandleWebhookHandler` - inbound EuPago notifications
//! - `ReconcilePaymentHandler` - guarded state transitions
//! - `PaymentLocator` - identifier and info-scan lookup
//! - `HandleReturnHandler` - customer return URLs
//! - `SimulateWebhookHandler` - debug-mode synthetic notifications
//! - `InitiatePaymentHandler` - outbound payment creation

mod errors;
mod handle_return;
mod handle_webhook;
mod initiate_payment;
mod locate_payment;
mod reconcile_payment;
mod simulate_webhook;

pub use errors::PaymentFlowError;
pub use handle_return::{
    HandleReturnCommand, HandleReturnHandler, HandleReturnResult, RedirectKind, ReturnStatus,
};
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult};
pub use initiate_payment::{InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult};
pub use locate_payment::PaymentLocator;
pub use reconcile_payment::{
    ReconcileError, ReconcilePaymentCommand, ReconcilePaymentHandler, ReconcilePaymentResult,
};
pub use simulate_webhook::{SimulateWebhookCommand, SimulateWebhookHandler, SimulateWebhookResult};
