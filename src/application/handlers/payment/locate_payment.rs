//! PaymentLocator - Resolves a local payment from gateway identifiers.

use std::sync::Arc;

use crate::domain::foundation::TenantKey;
use crate::domain::payment::{Payment, PaymentIdentifier};
use crate::ports::{PaymentRepository, RepositoryError};

/// Finds the payment a notification refers to.
///
/// Exact lookup by `{order}-P-{seq}` first. When that fails, the newest
/// `scan_limit` gateway payments of the organizer are searched for the
/// identifier and then the reference inside their stored info. Older
/// payments are not reachable through the scan.
pub struct PaymentLocator {
    repository: Arc<dyn PaymentRepository>,
    scan_limit: usize,
}

impl PaymentLocator {
    pub fn new(repository: Arc<dyn PaymentRepository>, scan_limit: usize) -> Self {
        Self {
            repository,
            scan_limit,
        }
    }

    pub async fn find(
        &self,
        tenant: &TenantKey,
        identifier: Option<&str>,
        reference: Option<&str>,
    ) -> Result<Option<Payment>, RepositoryError> {
        let identifier = identifier.map(str::trim).filter(|s| !s.is_empty());
        let reference = reference.map(str::trim).filter(|s| !s.is_empty());

        if let Some(parsed) = identifier.and_then(PaymentIdentifier::parse) {
            let found = self
                .repository
                .find_by_identifier(tenant, &parsed.order_code, parsed.local_id)
                .await?;
            if let Some(payment) = found {
                tracing::debug!(payment_id = %payment.id, identifier = %parsed, "Payment found by identifier");
                return Ok(Some(payment));
            }
        }

        if identifier.is_none() && reference.is_none() {
            return Ok(None);
        }

        let recent = self
            .repository
            .recent_for_family(tenant, self.scan_limit)
            .await?;

        for needle in [identifier, reference].into_iter().flatten() {
            if let Some(payment) = recent.iter().find(|p| p.info_mentions(needle)) {
                tracing::info!(
                    payment_id = %payment.id,
                    needle = %needle,
                    scanned = recent.len(),
                    "Payment found by info scan"
                );
                return Ok(Some(payment.clone()));
            }
        }

        Ok(None)
    }
}
