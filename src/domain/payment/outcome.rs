//! Canonical payment outcome and the gateway status vocabulary.
//!
//! EuPago reports status tokens in English and Portuguese with inconsistent
//! casing across its two webhook generations. Matching is case-sensitive
//! against a fixed table; anything unlisted is `Unknown`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol-independent payment result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed,
    Cancelled,
    Expired,
    Pending,
    Unknown,
}

const COMPLETED_TOKENS: &[&str] = &[
    "Success",
    "Sucesso",
    "success",
    "Paid",
    "paid",
    "Completed",
    "completed",
];
const FAILED_TOKENS: &[&str] = &["Failed", "Falhado", "failed", "error"];
const CANCELLED_TOKENS: &[&str] = &["Cancelled", "Canceled", "Cancelado", "canceled", "cancelled"];
const EXPIRED_TOKENS: &[&str] = &["Expired", "Expirado", "expired", "timeout"];
const PENDING_TOKENS: &[&str] = &["Pending", "Pendente", "pending", "processing"];

const STATUS_TABLE: &[(Outcome, &[&str])] = &[
    (Outcome::Completed, COMPLETED_TOKENS),
    (Outcome::Failed, FAILED_TOKENS),
    (Outcome::Cancelled, CANCELLED_TOKENS),
    (Outcome::Expired, EXPIRED_TOKENS),
    (Outcome::Pending, PENDING_TOKENS),
];

/// Transaction fields that may carry the status, in lookup order.
const STATUS_FIELDS: &[&str] = &["status", "transactionStatus", "estado"];

impl Outcome {
    /// Maps a raw gateway status token. Total: never fails.
    pub fn from_status(raw: &str) -> Self {
        STATUS_TABLE
            .iter()
            .find(|(_, tokens)| tokens.contains(&raw))
            .map(|(outcome, _)| *outcome)
            .unwrap_or(Outcome::Unknown)
    }

    /// Maps the status carried by a transaction object.
    pub fn from_transaction(transaction: &Value) -> Self {
        status_token(transaction)
            .map(Self::from_status)
            .unwrap_or(Outcome::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Failed => "failed",
            Outcome::Cancelled => "cancelled",
            Outcome::Expired => "expired",
            Outcome::Pending => "pending",
            Outcome::Unknown => "unknown",
        }
    }
}

/// First non-empty status token found in `status`, `transactionStatus` or
/// `estado`.
pub fn status_token(transaction: &Value) -> Option<&str> {
    STATUS_FIELDS
        .iter()
        .filter_map(|field| transaction.get(*field).and_then(Value::as_str))
        .find(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn completed_tokens_map_to_completed() {
        for token in ["Success", "Sucesso", "paid", "Paid", "completed"] {
            assert_eq!(Outcome::from_status(token), Outcome::Completed, "{}", token);
        }
    }

    #[test]
    fn portuguese_tokens_are_recognised() {
        assert_eq!(Outcome::from_status("Falhado"), Outcome::Failed);
        assert_eq!(Outcome::from_status("Cancelado"), Outcome::Cancelled);
        assert_eq!(Outcome::from_status("Expirado"), Outcome::Expired);
        assert_eq!(Outcome::from_status("Pendente"), Outcome::Pending);
    }

    #[test]
    fn timeout_is_expired_and_error_is_failed() {
        assert_eq!(Outcome::from_status("timeout"), Outcome::Expired);
        assert_eq!(Outcome::from_status("error"), Outcome::Failed);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(Outcome::from_status("PAID"), Outcome::Unknown);
        assert_eq!(Outcome::from_status("sucesso"), Outcome::Unknown);
    }

    #[test]
    fn empty_status_is_unknown() {
        assert_eq!(Outcome::from_status(""), Outcome::Unknown);
    }

    #[test]
    fn tokens_belong_to_exactly_one_outcome() {
        for (outcome, tokens) in STATUS_TABLE {
            for token in *tokens {
                let owners = STATUS_TABLE
                    .iter()
                    .filter(|(_, t)| t.contains(token))
                    .count();
                assert_eq!(owners, 1, "{} listed twice", token);
                assert_eq!(Outcome::from_status(token), *outcome);
            }
        }
    }

    #[test]
    fn from_transaction_falls_back_through_status_fields() {
        assert_eq!(
            Outcome::from_transaction(&json!({"transactionStatus": "Sucesso"})),
            Outcome::Completed
        );
        assert_eq!(
            Outcome::from_transaction(&json!({"estado": "Falhado"})),
            Outcome::Failed
        );
        assert_eq!(
            Outcome::from_transaction(&json!({"status": "", "estado": "Pendente"})),
            Outcome::Pending
        );
        assert_eq!(Outcome::from_transaction(&json!({"amount": 10})), Outcome::Unknown);
    }

    proptest! {
        #[test]
        fn mapping_is_total(raw in ".*") {
            let outcome = Outcome::from_status(&raw);
            let listed = STATUS_TABLE.iter().any(|(_, t)| t.contains(&raw.as_str()));
            prop_assert_eq!(outcome == Outcome::Unknown, !listed);
        }
    }
}
