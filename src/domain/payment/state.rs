//! Payment state machine.
//!
//! Mirrors the host platform's payment lifecycle. Confirmed and Refunded are
//! terminal-success; Failed and Canceled are terminal-failure but may be
//! revived by a later gateway notification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle state of a local payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Created by checkout, never seen by the gateway.
    Created,

    /// Handed to the gateway, awaiting a result.
    Pending,

    /// Paid. Fulfillment has been triggered.
    Confirmed,

    /// Gateway reported a failure.
    Failed,

    /// Cancelled or expired.
    Canceled,

    /// Paid and later refunded.
    Refunded,
}

impl PaymentState {
    /// Confirmed or Refunded. The core never moves a payment out of these.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentState::Confirmed | PaymentState::Refunded)
    }

    /// Failed or Canceled.
    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, PaymentState::Failed | PaymentState::Canceled)
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Created => "created",
            PaymentState::Pending => "pending",
            PaymentState::Confirmed => "confirmed",
            PaymentState::Failed => "failed",
            PaymentState::Canceled => "canceled",
            PaymentState::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PaymentState::Created),
            "pending" => Ok(PaymentState::Pending),
            "confirmed" => Ok(PaymentState::Confirmed),
            "failed" => Ok(PaymentState::Failed),
            "canceled" => Ok(PaymentState::Canceled),
            "refunded" => Ok(PaymentState::Refunded),
            other => Err(ValidationError::invalid_format(
                "payment_state",
                format!("unknown state '{}'", other),
            )),
        }
    }
}

impl StateMachine for PaymentState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentState::*;
        matches!(
            (self, target),
            // From CREATED
            (Created, Pending)
                | (Created, Confirmed)
                | (Created, Failed)
                | (Created, Canceled)
            // From PENDING
                | (Pending, Confirmed)
                | (Pending, Failed)
                | (Pending, Canceled)
            // From FAILED
                | (Failed, Pending)
                | (Failed, Confirmed)
                | (Failed, Canceled)
            // From CANCELED
                | (Canceled, Pending)
                | (Canceled, Confirmed)
                | (Canceled, Failed)
            // From CONFIRMED
                | (Confirmed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentState::*;
        match self {
            Created => vec![Pending, Confirmed, Failed, Canceled],
            Pending => vec![Confirmed, Failed, Canceled],
            Failed => vec![Pending, Confirmed, Canceled],
            Canceled => vec![Pending, Confirmed, Failed],
            Confirmed => vec![Refunded],
            Refunded => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PaymentState; 6] = [
        PaymentState::Created,
        PaymentState::Pending,
        PaymentState::Confirmed,
        PaymentState::Failed,
        PaymentState::Canceled,
        PaymentState::Refunded,
    ];

    #[test]
    fn pending_can_transition_to_confirmed() {
        let result = PaymentState::Pending.transition_to(PaymentState::Confirmed);
        assert_eq!(result, Ok(PaymentState::Confirmed));
    }

    #[test]
    fn pending_cannot_go_back_to_created() {
        assert!(!PaymentState::Pending.can_transition_to(&PaymentState::Created));
    }

    #[test]
    fn canceled_can_be_revived_to_pending() {
        assert!(PaymentState::Canceled.can_transition_to(&PaymentState::Pending));
        assert!(PaymentState::Failed.can_transition_to(&PaymentState::Pending));
    }

    #[test]
    fn confirmed_only_moves_to_refunded() {
        assert_eq!(
            PaymentState::Confirmed.valid_transitions(),
            vec![PaymentState::Refunded]
        );
        assert!(!PaymentState::Confirmed.can_transition_to(&PaymentState::Failed));
    }

    #[test]
    fn refunded_is_terminal() {
        assert!(PaymentState::Refunded.is_terminal());
    }

    #[test]
    fn settled_states_are_confirmed_and_refunded() {
        let settled: Vec<_> = ALL.iter().filter(|s| s.is_settled()).collect();
        assert_eq!(settled, vec![&PaymentState::Confirmed, &PaymentState::Refunded]);
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for state in ALL {
            for target in ALL {
                assert_eq!(
                    state.can_transition_to(&target),
                    state.valid_transitions().contains(&target),
                    "{:?} -> {:?}",
                    state,
                    target
                );
            }
        }
    }

    #[test]
    fn storage_representation_round_trips() {
        for state in ALL {
            assert_eq!(state.as_str().parse::<PaymentState>(), Ok(state));
        }
        assert!("paid".parse::<PaymentState>().is_err());
    }
}
