//! EuPago payment method catalogue.

use serde::{Deserialize, Serialize};

/// Where the API key goes on an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyPlacement {
    /// `ApiKey: {key}` header.
    ApiKeyHeader,
    /// `Authorization: ApiKey {key}` header.
    AuthorizationHeader,
    /// `chave` field in the JSON body.
    BodyField,
}

/// Payment methods offered through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    MbWay,
    Multibanco,
    PayShop,
    PayByLink,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::CreditCard,
        PaymentMethod::MbWay,
        PaymentMethod::Multibanco,
        PaymentMethod::PayShop,
        PaymentMethod::PayByLink,
    ];

    /// Provider identifier stored on the payment row.
    pub fn provider_id(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "eupago_cc",
            PaymentMethod::MbWay => "eupago_mbway",
            PaymentMethod::Multibanco => "eupago_multibanco",
            PaymentMethod::PayShop => "eupago_payshop",
            PaymentMethod::PayByLink => "eupago_paybylink",
        }
    }

    pub fn from_provider_id(provider: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.provider_id() == provider)
    }

    /// Settings name of the description override, e.g. `mbway_description`.
    pub fn description_setting(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "cc_description",
            PaymentMethod::MbWay => "mbway_description",
            PaymentMethod::Multibanco => "multibanco_description",
            PaymentMethod::PayShop => "payshop_description",
            PaymentMethod::PayByLink => "paybylink_description",
        }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Pay securely with your credit card",
            PaymentMethod::MbWay => "Pay with MBWay using your mobile phone",
            PaymentMethod::Multibanco => "Pay via bank transfer using Multibanco reference",
            PaymentMethod::PayShop => "Pay in cash at any PayShop location",
            PaymentMethod::PayByLink => "Pay online with your preferred payment method",
        }
    }

    /// Path appended to the sandbox or live base URL.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "/api/v1.02/creditcard/create",
            PaymentMethod::MbWay => "/api/v1.02/mbway/create",
            PaymentMethod::Multibanco => "/clientes/rest_api/multibanco/create",
            PaymentMethod::PayShop => "/clientes/rest_api/payshop/create",
            PaymentMethod::PayByLink => "/api/v1.02/paybylink/create",
        }
    }

    pub fn key_placement(&self) -> ApiKeyPlacement {
        match self {
            PaymentMethod::CreditCard => ApiKeyPlacement::ApiKeyHeader,
            PaymentMethod::MbWay | PaymentMethod::PayByLink => ApiKeyPlacement::AuthorizationHeader,
            PaymentMethod::Multibanco | PaymentMethod::PayShop => ApiKeyPlacement::BodyField,
        }
    }

    /// Upper bound accepted by the gateway, in cents.
    pub fn max_amount_cents(&self) -> Option<i64> {
        match self {
            PaymentMethod::CreditCard => Some(399_900),
            _ => None,
        }
    }

    pub fn accepts_amount(&self, amount_cents: i64) -> bool {
        amount_cents > 0 && self.max_amount_cents().map_or(true, |max| amount_cents <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_round_trip() {
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::from_provider_id(method.provider_id()), Some(method));
            assert!(method.provider_id().starts_with("eupago"));
        }
        assert_eq!(PaymentMethod::from_provider_id("stripe"), None);
    }

    #[test]
    fn reference_methods_send_key_in_body() {
        assert_eq!(PaymentMethod::Multibanco.key_placement(), ApiKeyPlacement::BodyField);
        assert_eq!(PaymentMethod::PayShop.key_placement(), ApiKeyPlacement::BodyField);
        assert_eq!(PaymentMethod::CreditCard.key_placement(), ApiKeyPlacement::ApiKeyHeader);
    }

    #[test]
    fn credit_card_is_capped() {
        assert!(PaymentMethod::CreditCard.accepts_amount(399_900));
        assert!(!PaymentMethod::CreditCard.accepts_amount(399_901));
        assert!(PaymentMethod::Multibanco.accepts_amount(1_000_000));
        assert!(!PaymentMethod::MbWay.accepts_amount(0));
    }
}
