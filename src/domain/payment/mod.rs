//! Payment domain - the host's payment record as seen by the gateway
//! integration.
//!
//! - `state` - lifecycle state machine
//! - `aggregate` - payment record and `{order}-P-{seq}` identifier
//! - `outcome` - gateway status vocabulary mapped to a canonical outcome
//! - `reconcile` - how an outcome changes a payment
//! - `method` - payment method catalogue

mod aggregate;
mod method;
mod outcome;
mod reconcile;
mod state;

pub use aggregate::{format_cents, info_from_value, Payment, PaymentIdentifier, PROVIDER_FAMILY};
pub use method::{ApiKeyPlacement, PaymentMethod};
pub use outcome::{status_token, Outcome};
pub use reconcile::{decide, Decision, PaymentUpdate, CONFIRMED_AT_KEY};
pub use state::PaymentState;
