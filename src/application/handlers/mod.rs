//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    HandleReturnCommand, HandleReturnHandler, HandleReturnResult, HandleWebhookCommand,
    HandleWebhookHandler, HandleWebhookResult, InitiatePaymentCommand, InitiatePaymentHandler,
    InitiatePaymentResult, PaymentFlowError, PaymentLocator, ReconcileError,
    ReconcilePaymentCommand, ReconcilePaymentHandler, ReconcilePaymentResult, RedirectKind,
    ReturnStatus, SimulateWebhookCommand, SimulateWebhookHandler, SimulateWebhookResult,
};
