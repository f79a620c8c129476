//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers, timestamps, state machine trait and validation
//! errors used across the payment and webhook domains.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{PaymentId, TenantKey};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
