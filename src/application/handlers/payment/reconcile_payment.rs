//! ReconcilePaymentHandler - Applies a gateway outcome to a payment.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{decide, Decision, Outcome, Payment, PaymentState};
use crate::ports::{CasResult, OrderFulfillment, PaymentRepository, RepositoryError};

/// Command to reconcile a payment with a gateway outcome.
#[derive(Debug, Clone)]
pub struct ReconcilePaymentCommand {
    /// Payment as last read by the caller.
    pub payment: Payment,
    pub outcome: Outcome,
    /// Gateway fields merged into the payment info.
    pub payload: Value,
}

/// Result of reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilePaymentResult {
    /// State and info written.
    Applied {
        payment: Payment,
        previous: PaymentState,
    },
    /// Nothing written; the payment already reflects the outcome.
    Skipped {
        payment: Payment,
        reason: &'static str,
    },
}

impl ReconcilePaymentResult {
    pub fn payment(&self) -> &Payment {
        match self {
            ReconcilePaymentResult::Applied { payment, .. }
            | ReconcilePaymentResult::Skipped { payment, .. } => payment,
        }
    }

    pub fn state_changed(&self) -> bool {
        match self {
            ReconcilePaymentResult::Applied { payment, previous } => payment.state != *previous,
            ReconcilePaymentResult::Skipped { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Payment kept changing concurrently after {0} attempts")]
    Contention(u32),

    #[error("Reconciliation task aborted: {0}")]
    Interrupted(String),
}

/// Handler for reconciling payments.
///
/// Every write is a compare-and-set against the state the decision was made
/// from. When another writer got there first the payment is re-read and the
/// decision taken again, so concurrent deliveries of the same notification
/// confirm the payment, and fire fulfillment, once.
///
/// The write and the fulfillment it triggers run on their own task. Dropping
/// the `handle` future (a client disconnect, a request timeout) does not stop
/// a committed confirmation from reaching fulfillment.
#[derive(Clone)]
pub struct ReconcilePaymentHandler {
    repository: Arc<dyn PaymentRepository>,
    fulfillment: Arc<dyn OrderFulfillment>,
    max_attempts: u32,
}

impl ReconcilePaymentHandler {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        fulfillment: Arc<dyn OrderFulfillment>,
        max_attempts: u32,
    ) -> Self {
        Self {
            repository,
            fulfillment,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcilePaymentCommand,
    ) -> Result<ReconcilePaymentResult, ReconcileError> {
        let handler = self.clone();
        tokio::spawn(async move { handler.run(cmd).await })
            .await
            .map_err(|e| ReconcileError::Interrupted(e.to_string()))?
    }

    async fn run(
        &self,
        cmd: ReconcilePaymentCommand,
    ) -> Result<ReconcilePaymentResult, ReconcileError> {
        let mut current = cmd.payment;

        for attempt in 1..=self.max_attempts {
            let update = match decide(&current, cmd.outcome, &cmd.payload, Timestamp::now()) {
                Decision::Skip { reason } => {
                    tracing::info!(
                        payment_id = %current.id,
                        outcome = cmd.outcome.as_str(),
                        state = %current.state,
                        reason,
                        "Payment unchanged"
                    );
                    return Ok(ReconcilePaymentResult::Skipped {
                        payment: current,
                        reason,
                    });
                }
                Decision::Write(update) => update,
            };

            let confirms = update.confirms();
            let previous = update.expected_state;

            match self
                .repository
                .compare_and_set(&current.id, previous, update.new_state, update.info)
                .await?
            {
                CasResult::Applied(stored) => {
                    tracing::info!(
                        payment_id = %stored.id,
                        outcome = cmd.outcome.as_str(),
                        from = %previous,
                        to = %stored.state,
                        "Payment reconciled"
                    );
                    if confirms {
                        self.fulfill(&stored).await;
                    }
                    return Ok(ReconcilePaymentResult::Applied {
                        payment: stored,
                        previous,
                    });
                }
                CasResult::Conflict(latest) => {
                    tracing::warn!(
                        payment_id = %latest.id,
                        expected = %previous,
                        actual = %latest.state,
                        attempt,
                        "Concurrent payment update, re-evaluating"
                    );
                    current = latest;
                }
            }
        }

        Err(ReconcileError::Contention(self.max_attempts))
    }

    /// The confirmation is already committed, so a failing side effect is
    /// logged for the host to retry rather than undoing the state change.
    async fn fulfill(&self, payment: &Payment) {
        if let Err(e) = self.fulfillment.payment_confirmed(payment).await {
            tracing::error!(
                payment_id = %payment.id,
                error = %e,
                "Order fulfillment failed after payment confirmation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPaymentRepository, RecordingFulfillment};
    use crate::domain::foundation::{PaymentId, TenantKey};
    use crate::domain::payment::CONFIRMED_AT_KEY;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Mutex;
    use std::time::Duration;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    /// Simulates competing writers: each CAS call first forces the stored
    /// payment into the next queued state.
    struct RacingRepository {
        inner: InMemoryPaymentRepository,
        forced: Mutex<Vec<PaymentState>>,
    }

    impl RacingRepository {
        fn new(inner: InMemoryPaymentRepository, forced: Vec<PaymentState>) -> Self {
            let mut forced = forced;
            forced.reverse();
            Self {
                inner,
                forced: Mutex::new(forced),
            }
        }
    }

    #[async_trait]
    impl PaymentRepository for RacingRepository {
        async fn find_by_id(
            &self,
            tenant: &TenantKey,
            id: &PaymentId,
        ) -> Result<Option<Payment>, RepositoryError> {
            self.inner.find_by_id(tenant, id).await
        }

        async fn find_by_identifier(
            &self,
            tenant: &TenantKey,
            order_code: &str,
            local_id: u32,
        ) -> Result<Option<Payment>, RepositoryError> {
            self.inner.find_by_identifier(tenant, order_code, local_id).await
        }

        async fn recent_for_family(
            &self,
            tenant: &TenantKey,
            limit: usize,
        ) -> Result<Vec<Payment>, RepositoryError> {
            self.inner.recent_for_family(tenant, limit).await
        }

        async fn compare_and_set(
            &self,
            id: &PaymentId,
            expected: PaymentState,
            new_state: PaymentState,
            info: Map<String, Value>,
        ) -> Result<CasResult, RepositoryError> {
            let forced = self.forced.lock().unwrap().pop();
            if let Some(state) = forced {
                let mut stored = self.inner.get(id).await.ok_or(RepositoryError::NotFound(*id))?;
                stored.state = state;
                self.inner.save(&stored).await?;
            }
            self.inner.compare_and_set(id, expected, new_state, info).await
        }

        async fn save(&self, payment: &Payment) -> Result<(), RepositoryError> {
            self.inner.save(payment).await
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl PaymentRepository for FailingRepository {
        async fn find_by_id(&self, _: &TenantKey, _: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
            Ok(None)
        }

        async fn find_by_identifier(&self, _: &TenantKey, _: &str, _: u32) -> Result<Option<Payment>, RepositoryError> {
            Ok(None)
        }

        async fn recent_for_family(&self, _: &TenantKey, _: usize) -> Result<Vec<Payment>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn compare_and_set(
            &self,
            _: &PaymentId,
            _: PaymentState,
            _: PaymentState,
            _: Map<String, Value>,
        ) -> Result<CasResult, RepositoryError> {
            Err(RepositoryError::Database("connection reset".to_string()))
        }

        async fn save(&self, _: &Payment) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn pending_payment() -> Payment {
        Payment::new(TenantKey::new("festival").unwrap(), "EVT1", 1, "eupago_mbway", 1000, "EUR")
            .with_state(PaymentState::Pending)
    }

    fn paid(payment: &Payment) -> ReconcilePaymentCommand {
        ReconcilePaymentCommand {
            payment: payment.clone(),
            outcome: Outcome::Completed,
            payload: json!({"identifier": "EVT1-P-1", "status": "Paid"}),
        }
    }

    async fn setup(payment: &Payment) -> (InMemoryPaymentRepository, RecordingFulfillment, ReconcilePaymentHandler) {
        let repo = InMemoryPaymentRepository::with_payments([payment.clone()]).await;
        let fulfillment = RecordingFulfillment::new();
        let handler = ReconcilePaymentHandler::new(Arc::new(repo.clone()), Arc::new(fulfillment.clone()), 3);
        (repo, fulfillment, handler)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn completed_confirms_and_fulfills_once() {
        let payment = pending_payment();
        let (repo, fulfillment, handler) = setup(&payment).await;

        let result = handler.handle(paid(&payment)).await.unwrap();

        assert!(result.state_changed());
        let stored = repo.get(&payment.id).await.unwrap();
        assert_eq!(stored.state, PaymentState::Confirmed);
        assert_eq!(stored.info["status"], "Paid");
        assert!(stored.info.contains_key(CONFIRMED_AT_KEY));
        assert_eq!(fulfillment.count_for(&payment.id), 1);
    }

    #[tokio::test]
    async fn second_completed_delivery_changes_nothing() {
        let payment = pending_payment();
        let (repo, fulfillment, handler) = setup(&payment).await;

        handler.handle(paid(&payment)).await.unwrap();
        let stale = payment.clone();
        let second = handler.handle(paid(&stale)).await.unwrap();

        assert!(!second.state_changed());
        assert!(matches!(second, ReconcilePaymentResult::Skipped { .. }));
        assert_eq!(repo.get(&payment.id).await.unwrap().state, PaymentState::Confirmed);
        assert_eq!(fulfillment.count_for(&payment.id), 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_fulfill_exactly_once() {
        let payment = pending_payment();
        let (_, fulfillment, handler) = setup(&payment).await;
        let handler = Arc::new(handler);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handler = handler.clone();
                let cmd = paid(&payment);
                tokio::spawn(async move { handler.handle(cmd).await })
            })
            .collect();

        let mut changed = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().state_changed() {
                changed += 1;
            }
        }

        assert_eq!(changed, 1);
        assert_eq!(fulfillment.count_for(&payment.id), 1);
    }

    #[tokio::test]
    async fn lost_race_is_re_decided_against_fresh_state() {
        let payment = pending_payment();
        let inner = InMemoryPaymentRepository::with_payments([payment.clone()]).await;
        let repo = RacingRepository::new(inner.clone(), vec![PaymentState::Confirmed]);
        let fulfillment = RecordingFulfillment::new();
        let handler = ReconcilePaymentHandler::new(Arc::new(repo), Arc::new(fulfillment.clone()), 3);

        let result = handler
            .handle(ReconcilePaymentCommand {
                payment: payment.clone(),
                outcome: Outcome::Failed,
                payload: json!({"status": "Failed"}),
            })
            .await
            .unwrap();

        assert!(matches!(result, ReconcilePaymentResult::Skipped { .. }));
        assert_eq!(inner.get(&payment.id).await.unwrap().state, PaymentState::Confirmed);
        assert!(fulfillment.confirmed().is_empty());
    }

    #[tokio::test]
    async fn persistent_contention_gives_up() {
        let payment = pending_payment();
        let inner = InMemoryPaymentRepository::with_payments([payment.clone()]).await;
        let repo = RacingRepository::new(inner, vec![PaymentState::Created, PaymentState::Pending]);
        let handler = ReconcilePaymentHandler::new(Arc::new(repo), Arc::new(RecordingFulfillment::new()), 2);

        let mut cmd = paid(&payment);
        cmd.outcome = Outcome::Failed;
        let err = handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Contention(2)));
    }

    #[tokio::test]
    async fn unknown_outcome_records_payload_without_state_change() {
        let payment = pending_payment();
        let (repo, fulfillment, handler) = setup(&payment).await;

        let result = handler
            .handle(ReconcilePaymentCommand {
                payment: payment.clone(),
                outcome: Outcome::Unknown,
                payload: json!({"status": "Reembolsado"}),
            })
            .await
            .unwrap();

        assert!(!result.state_changed());
        let stored = repo.get(&payment.id).await.unwrap();
        assert_eq!(stored.state, PaymentState::Pending);
        assert_eq!(stored.info["status"], "Reembolsado");
        assert!(fulfillment.confirmed().is_empty());
    }

    #[tokio::test]
    async fn fulfillment_failure_does_not_undo_confirmation() {
        let payment = pending_payment();
        let repo = InMemoryPaymentRepository::with_payments([payment.clone()]).await;
        let fulfillment = RecordingFulfillment::failing();
        let handler = ReconcilePaymentHandler::new(Arc::new(repo.clone()), Arc::new(fulfillment.clone()), 3);

        let result = handler.handle(paid(&payment)).await.unwrap();

        assert!(result.state_changed());
        assert_eq!(repo.get(&payment.id).await.unwrap().state, PaymentState::Confirmed);
        assert_eq!(fulfillment.count_for(&payment.id), 1);
    }

    #[tokio::test]
    async fn cancelled_caller_still_fulfills_committed_confirmation() {
        let payment = pending_payment();
        let repo = InMemoryPaymentRepository::with_payments([payment.clone()]).await;
        let fulfillment = RecordingFulfillment::with_delay(Duration::from_millis(100));
        let handler = ReconcilePaymentHandler::new(Arc::new(repo.clone()), Arc::new(fulfillment.clone()), 3);

        let cut_short = tokio::time::timeout(Duration::from_millis(20), handler.handle(paid(&payment))).await;
        assert!(cut_short.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(repo.get(&payment.id).await.unwrap().state, PaymentState::Confirmed);
        assert_eq!(fulfillment.count_for(&payment.id), 1);

        let redelivery = handler.handle(paid(&payment)).await.unwrap();
        assert!(matches!(redelivery, ReconcilePaymentResult::Skipped { .. }));
        assert_eq!(fulfillment.count_for(&payment.id), 1);
    }

    #[tokio::test]
    async fn repository_failure_surfaces() {
        let payment = pending_payment();
        let handler = ReconcilePaymentHandler::new(
            Arc::new(FailingRepository),
            Arc::new(RecordingFulfillment::new()),
            3,
        );

        let err = handler.handle(paid(&payment)).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Repository(RepositoryError::Database(_))));
    }
}
