//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Host Ports
//!
//! - `PaymentRepository` - Payment rows owned by the ticketing host
//! - `SettingsStore` - Organizer-scoped key/value settings
//! - `OrderFulfillment` - Side effects of a confirmed payment
//!
//! ## Gateway Ports
//!
//! - `PaymentGateway` - Outbound EuPago payment creation

mod order_fulfillment;
mod payment_gateway;
mod payment_repository;
mod settings_store;

pub use order_fulfillment::{FulfillmentError, OrderFulfillment};
pub use payment_gateway::{
    CallbackUrls, CreatePaymentRequest, GatewayCredentials, GatewayPayment, PaymentError,
    PaymentErrorCode, PaymentGateway,
};
pub use payment_repository::{CasResult, PaymentRepository, RepositoryError};
pub use settings_store::{SettingsError, SettingsStore};
