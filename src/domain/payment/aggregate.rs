//! Payment aggregate and gateway identifier.
//!
//! The payment row is owned by the ticketing host. This crate only reads it,
//! merges gateway notifications into `info`, and moves `state` through
//! [`PaymentState`].
//!
//! # Invariants
//!
//! - `amount_cents` and `currency` never change after creation
//! - `info` is a JSON object and only grows by merging
//! - `state` only changes along `PaymentState`'s transition table

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{PaymentId, TenantKey, Timestamp};

use super::PaymentState;

/// Prefix shared by every EuPago provider identifier (`eupago_mbway`, ...).
pub const PROVIDER_FAMILY: &str = "eupago";

/// Literal separator between order code and local sequence.
const IDENTIFIER_SEPARATOR: &str = "-P-";

/// Gateway-visible payment key: `{orderCode}-P-{localSequence}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentIdentifier {
    pub order_code: String,
    pub local_id: u32,
}

impl PaymentIdentifier {
    pub fn new(order_code: impl Into<String>, local_id: u32) -> Self {
        Self {
            order_code: order_code.into(),
            local_id,
        }
    }

    /// Splits on the first `-P-`. Returns `None` when the separator is
    /// missing, either side is empty, or the sequence is not a number.
    pub fn parse(raw: &str) -> Option<Self> {
        let (order_code, local_id) = raw.trim().split_once(IDENTIFIER_SEPARATOR)?;
        if order_code.is_empty() {
            return None;
        }
        let local_id = local_id.parse::<u32>().ok()?;
        Some(Self::new(order_code, local_id))
    }
}

impl fmt::Display for PaymentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.order_code, IDENTIFIER_SEPARATOR, self.local_id)
    }
}

/// Payment aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier of the local record.
    pub id: PaymentId,

    /// Organizer owning the order.
    pub tenant: TenantKey,

    /// Host order code.
    pub order_code: String,

    /// Per-order payment sequence.
    pub local_id: u32,

    /// Provider identifier, e.g. `eupago_multibanco`.
    pub provider: String,

    /// Current lifecycle state.
    pub state: PaymentState,

    /// Amount in cents.
    pub amount_cents: i64,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Accumulated gateway data.
    pub info: Map<String, Value>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Creates a fresh payment in the `Created` state.
    pub fn new(
        tenant: TenantKey,
        order_code: impl Into<String>,
        local_id: u32,
        provider: impl Into<String>,
        amount_cents: i64,
        currency: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: PaymentId::new(),
            tenant,
            order_code: order_code.into(),
            local_id,
            provider: provider.into(),
            state: PaymentState::Created,
            amount_cents,
            currency: currency.into(),
            info: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style state override, used when loading fixtures.
    pub fn with_state(mut self, state: PaymentState) -> Self {
        self.state = state;
        self
    }

    /// Builder-style creation time override.
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    /// The identifier sent to the gateway at creation time.
    pub fn identifier(&self) -> PaymentIdentifier {
        PaymentIdentifier::new(self.order_code.clone(), self.local_id)
    }

    /// True if the provider belongs to the EuPago family.
    pub fn is_gateway_payment(&self) -> bool {
        self.provider.starts_with(PROVIDER_FAMILY)
    }

    /// Amount rendered as a decimal string, e.g. `1000` -> `"10.00"`.
    pub fn amount_decimal(&self) -> String {
        format_cents(self.amount_cents)
    }

    /// Merges `payload` over the existing info object.
    ///
    /// Object payloads are merged key by key (later wins). Any other JSON
    /// value is kept under `payload`.
    pub fn merge_info(&mut self, payload: &Value) {
        match payload {
            Value::Object(fields) => {
                for (key, value) in fields {
                    self.info.insert(key.clone(), value.clone());
                }
            }
            Value::Null => {}
            other => {
                self.info.insert("payload".to_string(), other.clone());
            }
        }
    }

    /// Sets a single info field.
    pub fn set_info_field(&mut self, key: &str, value: Value) {
        self.info.insert(key.to_string(), value);
    }

    /// Substring search over the serialized info blob.
    pub fn info_mentions(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        serde_json::to_string(&self.info)
            .map(|text| text.contains(needle))
            .unwrap_or(false)
    }
}

/// Normalises a stored info value into an object.
///
/// Rows written by older plugin versions may hold a non-object; it is kept
/// under `legacy`.
pub fn info_from_value(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("legacy".to_string(), other);
            map
        }
    }
}

/// Renders integer cents as `units.cents`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payment() -> Payment {
        Payment::new(
            TenantKey::new("org").unwrap(),
            "ABC12",
            3,
            "eupago_mbway",
            1000,
            "EUR",
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Identifier Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn identifier_parses_order_code_and_sequence() {
        let id = PaymentIdentifier::parse("ABC12-P-3").unwrap();
        assert_eq!(id.order_code, "ABC12");
        assert_eq!(id.local_id, 3);
    }

    #[test]
    fn identifier_splits_on_first_separator_only() {
        assert_eq!(PaymentIdentifier::parse("A-P-B-P-1"), None);
        let id = PaymentIdentifier::parse("A-B-P-7").unwrap();
        assert_eq!(id.order_code, "A-B");
        assert_eq!(id.local_id, 7);
    }

    #[test]
    fn identifier_rejects_missing_separator_or_bad_sequence() {
        assert_eq!(PaymentIdentifier::parse("217404"), None);
        assert_eq!(PaymentIdentifier::parse("-P-3"), None);
        assert_eq!(PaymentIdentifier::parse("ABC-P-x"), None);
    }

    #[test]
    fn identifier_displays_wire_format() {
        assert_eq!(payment().identifier().to_string(), "ABC12-P-3");
    }

    // ══════════════════════════════════════════════════════════════
    // Info Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn merge_info_keeps_existing_fields() {
        let mut p = payment();
        p.merge_info(&json!({"referencia": "217404", "status": "Pending"}));
        p.merge_info(&json!({"status": "Paid"}));

        assert_eq!(p.info["referencia"], "217404");
        assert_eq!(p.info["status"], "Paid");
    }

    #[test]
    fn merge_info_wraps_non_object_payloads() {
        let mut p = payment();
        p.merge_info(&json!(["raw"]));
        assert_eq!(p.info["payload"], json!(["raw"]));
    }

    #[test]
    fn info_from_value_keeps_legacy_text() {
        let info = info_from_value(json!("legacy text"));
        assert_eq!(info["legacy"], "legacy text");
        assert!(info_from_value(Value::Null).is_empty());
    }

    #[test]
    fn info_mentions_finds_nested_values() {
        let mut p = payment();
        p.merge_info(&json!({"gateway": {"reference": "998877"}}));

        assert!(p.info_mentions("998877"));
        assert!(!p.info_mentions("112233"));
        assert!(!p.info_mentions(""));
    }

    // ══════════════════════════════════════════════════════════════
    // State Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_payment_starts_created() {
        let p = payment();
        assert_eq!(p.state, PaymentState::Created);
        assert!(p.is_gateway_payment());
    }

    #[test]
    fn format_cents_renders_two_decimals() {
        assert_eq!(format_cents(1000), "10.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-250), "-2.50");
    }
}
