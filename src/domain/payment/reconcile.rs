//! Reconciliation rules: what an outcome does to a payment.
//!
//! Pure decision logic. Persisting the result atomically is the job of the
//! repository's guarded write; see `ReconcilePaymentHandler`.

use serde_json::{Map, Value};

use crate::domain::foundation::{StateMachine, Timestamp};

use super::{Outcome, Payment, PaymentState};

/// Info key stamped when a webhook confirms a payment.
pub const CONFIRMED_AT_KEY: &str = "webhook_confirmed_at";

/// A write to perform against the payment row.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    /// State the decision was based on. The write must re-check it.
    pub expected_state: PaymentState,

    /// State to store.
    pub new_state: PaymentState,

    /// Full info object to store.
    pub info: Map<String, Value>,
}

impl PaymentUpdate {
    pub fn changes_state(&self) -> bool {
        self.expected_state != self.new_state
    }

    /// True when this write is the one moving the payment into Confirmed.
    pub fn confirms(&self) -> bool {
        self.changes_state() && self.new_state == PaymentState::Confirmed
    }
}

/// Result of applying an outcome to the current payment snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Nothing to write.
    Skip { reason: &'static str },

    /// Write `info` and possibly `state`.
    Write(PaymentUpdate),
}

/// Decides how `outcome` changes `payment`.
///
/// - Completed: merge, stamp, Confirmed
/// - Failed: merge, Failed
/// - Cancelled/Expired: merge, Canceled
/// - Pending/Unknown: merge only; Created advances to Pending once
///
/// A state-changing outcome is skipped when the payment is already in the
/// target state or the transition table does not allow the move.
pub fn decide(payment: &Payment, outcome: Outcome, payload: &Value, now: Timestamp) -> Decision {
    let current = payment.state;
    let mut next = payment.clone();

    let (target, already) = match outcome {
        Outcome::Completed => (PaymentState::Confirmed, "payment already confirmed"),
        Outcome::Failed => (PaymentState::Failed, "payment already failed"),
        Outcome::Cancelled | Outcome::Expired => {
            (PaymentState::Canceled, "payment already cancelled")
        }
        Outcome::Pending | Outcome::Unknown => {
            next.merge_info(payload);
            let target = if current == PaymentState::Created {
                PaymentState::Pending
            } else {
                current
            };
            return Decision::Write(PaymentUpdate {
                expected_state: current,
                new_state: target,
                info: next.info,
            });
        }
    };

    if current == target {
        return Decision::Skip { reason: already };
    }
    if !current.can_transition_to(&target) {
        return Decision::Skip {
            reason: "payment already settled",
        };
    }

    next.merge_info(payload);
    if target == PaymentState::Confirmed {
        next.set_info_field(CONFIRMED_AT_KEY, Value::String(now.to_rfc3339()));
    }

    Decision::Write(PaymentUpdate {
        expected_state: current,
        new_state: target,
        info: next.info,
    })
}
