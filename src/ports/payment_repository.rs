//! Payment repository port.
//!
//! The payment row belongs to the ticketing host. The webhook pipeline reads
//! it, scans recent rows for fuzzy matches, and writes state and info back
//! through a guarded compare-and-set.
//!
//! # Design
//!
//! - **Tenant scoped**: every lookup is restricted to one organizer
//! - **Family scoped**: only providers starting with `eupago` are visible to
//!   the identifier lookups
//! - **Guarded writes**: `compare_and_set` re-checks the state inside a
//!   transaction so concurrent notifications cannot both apply

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::foundation::{PaymentId, TenantKey};
use crate::domain::payment::{Payment, PaymentState};

/// Outcome of a guarded write.
#[derive(Debug, Clone, PartialEq)]
pub enum CasResult {
    /// State matched; the stored payment after the write.
    Applied(Payment),

    /// State had changed; the stored payment as found.
    Conflict(Payment),
}

/// Errors from payment persistence.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt payment row: {0}")]
    Corrupt(String),
}

/// Repository port for gateway payments.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Find by id within the tenant.
    async fn find_by_id(
        &self,
        tenant: &TenantKey,
        id: &PaymentId,
    ) -> Result<Option<Payment>, RepositoryError>;

    /// Exact lookup by order code and local sequence within the `eupago`
    /// provider family.
    async fn find_by_identifier(
        &self,
        tenant: &TenantKey,
        order_code: &str,
        local_id: u32,
    ) -> Result<Option<Payment>, RepositoryError>;

    /// Newest `limit` payments of the `eupago` family, newest first.
    async fn recent_for_family(
        &self,
        tenant: &TenantKey,
        limit: usize,
    ) -> Result<Vec<Payment>, RepositoryError>;

    /// Writes `new_state` only if the stored state still equals `expected`.
    /// The keys in `info` are merged onto the stored info, so keys another
    /// writer added under the same state survive. Runs in a single
    /// transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the payment does not exist
    /// - `Database` on persistence failure
    async fn compare_and_set(
        &self,
        id: &PaymentId,
        expected: PaymentState,
        new_state: PaymentState,
        info: Map<String, Value>,
    ) -> Result<CasResult, RepositoryError>;

    /// Insert or replace a payment. Used by the host and by fixtures.
    async fn save(&self, payment: &Payment) -> Result<(), RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PaymentRepository) {}
    }

    #[test]
    fn not_found_error_names_payment() {
        let id = PaymentId::new();
        let err = RepositoryError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
