//! In-memory payment repository.
//!
//! Useful for tests and for running the service without a database. The
//! guarded write holds the single write lock for its whole check-and-store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::domain::foundation::{PaymentId, TenantKey, Timestamp};
use crate::domain::payment::{Payment, PaymentState, PROVIDER_FAMILY};
use crate::ports::{CasResult, PaymentRepository, RepositoryError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with `payments`.
    pub async fn with_payments(payments: impl IntoIterator<Item = Payment>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.payments.write().await;
            for payment in payments {
                map.insert(payment.id, payment);
            }
        }
        repo
    }

    /// Snapshot of a stored payment, regardless of tenant.
    pub async fn get(&self, id: &PaymentId) -> Option<Payment> {
        self.payments.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }
}

fn in_family(payment: &Payment, tenant: &TenantKey) -> bool {
    &payment.tenant == tenant && payment.provider.starts_with(PROVIDER_FAMILY)
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn find_by_id(
        &self,
        tenant: &TenantKey,
        id: &PaymentId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments.get(id).filter(|p| &p.tenant == tenant).cloned())
    }

    async fn find_by_identifier(
        &self,
        tenant: &TenantKey,
        order_code: &str,
        local_id: u32,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .find(|p| in_family(p, tenant) && p.order_code == order_code && p.local_id == local_id)
            .cloned())
    }

    async fn recent_for_family(
        &self,
        tenant: &TenantKey,
        limit: usize,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        let mut matching: Vec<Payment> = payments
            .values()
            .filter(|p| in_family(p, tenant))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn compare_and_set(
        &self,
        id: &PaymentId,
        expected: PaymentState,
        new_state: PaymentState,
        info: Map<String, Value>,
    ) -> Result<CasResult, RepositoryError> {
        let mut payments = self.payments.write().await;
        let stored = payments.get_mut(id).ok_or(RepositoryError::NotFound(*id))?;

        if stored.state != expected {
            return Ok(CasResult::Conflict(stored.clone()));
        }

        stored.state = new_state;
        stored.info.extend(info);
        stored.updated_at = Timestamp::now();
        Ok(CasResult::Applied(stored.clone()))
    }

    async fn save(&self, payment: &Payment) -> Result<(), RepositoryError> {
        self.payments.write().await.insert(payment.id, payment.clone());
        Ok(())
    }
}
