//! PostgreSQL implementation of PaymentRepository.
//!
//! The guarded write locks the row with `SELECT ... FOR UPDATE`, re-checks the
//! state and updates inside one transaction, so two notifications for the
//! same payment serialize on the row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{PaymentId, TenantKey, Timestamp};
use crate::domain::payment::{info_from_value, Payment, PaymentState, PROVIDER_FAMILY};
use crate::ports::{CasResult, PaymentRepository, RepositoryError};

const PAYMENT_COLUMNS: &str = "id, tenant, order_code, local_id, provider, state, amount_cents, \
                               currency, info, created_at, updated_at";

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    tenant: String,
    order_code: String,
    local_id: i64,
    provider: String,
    state: String,
    amount_cents: i64,
    currency: String,
    info: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let tenant = TenantKey::new(row.tenant)
            .map_err(|e| RepositoryError::Corrupt(format!("Invalid tenant: {}", e)))?;
        let local_id = u32::try_from(row.local_id)
            .map_err(|_| RepositoryError::Corrupt(format!("Invalid local_id: {}", row.local_id)))?;
        let state = row
            .state
            .parse::<PaymentState>()
            .map_err(|e| RepositoryError::Corrupt(format!("Invalid state: {}", e)))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            tenant,
            order_code: row.order_code,
            local_id,
            provider: row.provider,
            state,
            amount_cents: row.amount_cents,
            currency: row.currency,
            info: info_from_value(row.info),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn family_pattern() -> String {
    format!("{}%", PROVIDER_FAMILY)
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn find_by_id(
        &self,
        tenant: &TenantKey,
        id: &PaymentId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE id = $1 AND tenant = $2",
            PAYMENT_COLUMNS
        );
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to fetch payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_identifier(
        &self,
        tenant: &TenantKey,
        order_code: &str,
        local_id: u32,
    ) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM payments \
             WHERE tenant = $1 AND order_code = $2 AND local_id = $3 AND provider LIKE $4",
            PAYMENT_COLUMNS
        );
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(tenant.as_str())
            .bind(order_code)
            .bind(i64::from(local_id))
            .bind(family_pattern())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to fetch payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn recent_for_family(
        &self,
        tenant: &TenantKey,
        limit: usize,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM payments \
             WHERE tenant = $1 AND provider LIKE $2 \
             ORDER BY created_at DESC LIMIT $3",
            PAYMENT_COLUMNS
        );
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
            .bind(tenant.as_str())
            .bind(family_pattern())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to scan payments: {}", e)))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn compare_and_set(
        &self,
        id: &PaymentId,
        expected: PaymentState,
        new_state: PaymentState,
        info: Map<String, Value>,
    ) -> Result<CasResult, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let select = format!("SELECT {} FROM payments WHERE id = $1 FOR UPDATE", PAYMENT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&select)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to lock payment: {}", e)))?;

        let current = match row {
            Some(row) => Payment::try_from(row)?,
            None => return Err(RepositoryError::NotFound(*id)),
        };

        if current.state != expected {
            tx.rollback().await.map_err(|e| {
                RepositoryError::Database(format!("Failed to roll back transaction: {}", e))
            })?;
            return Ok(CasResult::Conflict(current));
        }

        let mut merged = current.info;
        merged.extend(info);

        let update = format!(
            "UPDATE payments SET state = $2, info = $3, updated_at = $4 WHERE id = $1 RETURNING {}",
            PAYMENT_COLUMNS
        );
        let row: PaymentRow = sqlx::query_as(&update)
            .bind(id.as_uuid())
            .bind(new_state.as_str())
            .bind(Value::Object(merged))
            .bind(Timestamp::now().as_datetime())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to update payment: {}", e)))?;

        tx.commit().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(CasResult::Applied(Payment::try_from(row)?))
    }

    async fn save(&self, payment: &Payment) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, tenant, order_code, local_id, provider, state, amount_cents,
                currency, info, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                info = EXCLUDED.info,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.tenant.as_str())
        .bind(&payment.order_code)
        .bind(i64::from(payment.local_id))
        .bind(&payment.provider)
        .bind(payment.state.as_str())
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(Value::Object(payment.info.clone()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_order_local_key") {
                    return RepositoryError::Database(format!(
                        "Payment {} already exists",
                        payment.identifier()
                    ));
                }
            }
            RepositoryError::Database(format!("Failed to save payment: {}", e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(state: &str, local_id: i64, info: Value) -> PaymentRow {
        PaymentRow {
            id: Uuid::new_v4(),
            tenant: "org".to_string(),
            order_code: "ABC12".to_string(),
            local_id,
            provider: "eupago_mbway".to_string(),
            state: state.to_string(),
            amount_cents: 1000,
            currency: "EUR".to_string(),
            info,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_payment() {
        let payment = Payment::try_from(row("pending", 3, json!({"referencia": "1"}))).unwrap();
        assert_eq!(payment.state, PaymentState::Pending);
        assert_eq!(payment.identifier().to_string(), "ABC12-P-3");
        assert_eq!(payment.info["referencia"], "1");
    }

    #[test]
    fn row_with_unknown_state_is_corrupt() {
        let result = Payment::try_from(row("paid", 1, json!({})));
        assert!(matches!(result, Err(RepositoryError::Corrupt(_))));
    }

    #[test]
    fn row_with_negative_local_id_is_corrupt() {
        let result = Payment::try_from(row("created", -1, json!({})));
        assert!(matches!(result, Err(RepositoryError::Corrupt(_))));
    }

    #[test]
    fn legacy_text_info_is_preserved() {
        let payment = Payment::try_from(row("created", 1, json!("old plugin data"))).unwrap();
        assert_eq!(payment.info["legacy"], "old plugin data");
    }

    #[test]
    fn family_pattern_matches_prefix() {
        assert_eq!(family_pattern(), "eupago%");
    }
}
