//! In-memory adapters for tests and database-less runs.

mod fulfillment;
mod payment_repository;
mod settings_store;

pub use fulfillment::{LoggingFulfillment, RecordingFulfillment};
pub use payment_repository::InMemoryPaymentRepository;
pub use settings_store::InMemorySettingsStore;
