//! EuPago request bodies and response field extraction.
//!
//! The older REST endpoints (Multibanco, PayShop) take flat Portuguese field
//! names with the API key in the body; the v1.02 endpoints take a nested
//! `payment` object.

use serde_json::{json, Map, Value};

use crate::domain::payment::{format_cents, PaymentMethod};
use crate::ports::CreatePaymentRequest;

/// MB WAY numbers are Portuguese unless the host says otherwise.
const MBWAY_COUNTRY_CODE: &str = "+351";

/// Fields that may hold the customer redirect URL, in lookup order.
const REDIRECT_FIELDS: [&str; 5] = ["url", "redirect_url", "link", "paymentUrl", "redirectUrl"];

/// Builds the JSON body for `request`. `api_key` is only used by methods that
/// carry it in the body.
pub fn request_body(request: &CreatePaymentRequest, api_key: &str) -> Value {
    let amount = format_cents(request.amount_cents);
    let amount_value = request.amount_cents as f64 / 100.0;

    match request.method {
        PaymentMethod::CreditCard => {
            let mut body = json!({
                "valor": amount,
                "id": request.identifier,
                "canal": request.channel.as_deref().unwrap_or("default"),
                "resposta_url": request.urls.return_base,
            });
            if let Some(description) = &request.description {
                body["descricao"] = Value::String(description.clone());
            }
            body
        }
        PaymentMethod::MbWay => json!({
            "payment": {
                "amount": {"currency": request.currency, "value": amount_value},
                "customerPhone": request.customer_phone.as_deref().unwrap_or_default(),
                "identifier": request.identifier,
                "countryCode": MBWAY_COUNTRY_CODE,
                "webhookUrl": request.urls.webhook,
            }
        }),
        PaymentMethod::Multibanco | PaymentMethod::PayShop => json!({
            "valor": amount,
            "id": request.identifier,
            "webhook_url": request.urls.webhook,
            "chave": api_key,
        }),
        PaymentMethod::PayByLink => {
            let mut payment = json!({
                "amount": {"currency": request.currency, "value": amount_value},
                "identifier": request.identifier,
                "successUrl": request.urls.success,
                "failUrl": request.urls.fail,
                "backUrl": request.urls.back,
            });
            if let Some(description) = &request.description {
                payment["description"] = Value::String(description.clone());
            }
            json!({
                "payment": payment,
                "urlReturn": request.urls.return_base,
                "urlCallback": request.urls.webhook,
            })
        }
    }
}

/// Customer redirect URL, checking `data.paymentUrl` last.
pub fn redirect_url(response: &Value) -> Option<String> {
    REDIRECT_FIELDS
        .iter()
        .find_map(|field| non_empty_text(response.get(*field)))
        .or_else(|| non_empty_text(response.get("data").and_then(|d| d.get("paymentUrl"))))
}

pub fn reference(response: &Value) -> Option<String> {
    non_empty_text(response.get("referencia"))
        .or_else(|| non_empty_text(response.get("reference")))
        .or_else(|| non_empty_text(response.get("data").and_then(|d| d.get("reference"))))
}

pub fn transaction_id(response: &Value) -> Option<String> {
    non_empty_text(response.get("transactionId"))
        .or_else(|| non_empty_text(response.get("id")))
        .or_else(|| non_empty_text(response.get("data").and_then(|d| d.get("transactionId"))))
}

/// Gateway-supplied error text, if any.
pub fn error_message(response: &Value) -> Option<String> {
    non_empty_text(response.get("error")).or_else(|| non_empty_text(response.get("message")))
}

/// True when MB WAY accepted the push. `transactionStatus: Success` means the
/// push was sent, not that the customer paid.
pub fn mbway_accepted(response: &Value) -> bool {
    response.get("estado").and_then(Value::as_str) == Some("Pendente")
        || response.get("transactionStatus").and_then(Value::as_str) == Some("Success")
}

/// Drops the API key before a body is logged.
pub fn redacted(body: &Value) -> Value {
    match body {
        Value::Object(fields) => {
            let mut copy: Map<String, Value> = fields.clone();
            if copy.contains_key("chave") {
                copy.insert("chave".to_string(), Value::String("[REDACTED]".to_string()));
            }
            Value::Object(copy)
        }
        other => other.clone(),
    }
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CallbackUrls;

    fn request(method: PaymentMethod) -> CreatePaymentRequest {
        CreatePaymentRequest {
            method,
            identifier: "ABC12-P-1".to_string(),
            amount_cents: 1050,
            currency: "EUR".to_string(),
            description: Some("Festival ticket".to_string()),
            customer_phone: Some("912345678".to_string()),
            channel: Some("demo".to_string()),
            urls: CallbackUrls {
                webhook: "https://host/webhooks/eupago/org".to_string(),
                return_base: "https://host/return/org/ABC12/1".to_string(),
                success: "https://host/return/org/ABC12/1/success".to_string(),
                fail: "https://host/return/org/ABC12/1/fail".to_string(),
                back: "https://host/return/org/ABC12/1/back".to_string(),
            },
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Request Body Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn credit_card_body_uses_flat_fields() {
        let body = request_body(&request(PaymentMethod::CreditCard), "key");
        assert_eq!(body["valor"], "10.50");
        assert_eq!(body["id"], "ABC12-P-1");
        assert_eq!(body["canal"], "demo");
        assert_eq!(body["descricao"], "Festival ticket");
        assert!(body.get("chave").is_none());
    }

    #[test]
    fn mbway_body_is_nested() {
        let body = request_body(&request(PaymentMethod::MbWay), "key");
        assert_eq!(body["payment"]["amount"]["value"], 10.5);
        assert_eq!(body["payment"]["customerPhone"], "912345678");
        assert_eq!(body["payment"]["countryCode"], "+351");
    }

    #[test]
    fn reference_methods_carry_key_in_body() {
        for method in [PaymentMethod::Multibanco, PaymentMethod::PayShop] {
            let body = request_body(&request(method), "secret-key");
            assert_eq!(body["chave"], "secret-key");
            assert_eq!(body["webhook_url"], "https://host/webhooks/eupago/org");
        }
    }

    #[test]
    fn pay_by_link_body_has_all_return_urls() {
        let body = request_body(&request(PaymentMethod::PayByLink), "key");
        assert_eq!(body["payment"]["failUrl"], "https://host/return/org/ABC12/1/fail");
        assert_eq!(body["payment"]["description"], "Festival ticket");
        assert_eq!(body["urlCallback"], "https://host/webhooks/eupago/org");
    }

    #[test]
    fn redacted_hides_body_key() {
        let body = request_body(&request(PaymentMethod::Multibanco), "secret-key");
        assert_eq!(redacted(&body)["chave"], "[REDACTED]");
    }

    // ══════════════════════════════════════════════════════════════
    // Response Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn redirect_url_checks_all_known_fields() {
        assert_eq!(redirect_url(&json!({"link": "https://pay/1"})).as_deref(), Some("https://pay/1"));
        assert_eq!(
            redirect_url(&json!({"data": {"paymentUrl": "https://pay/2"}})).as_deref(),
            Some("https://pay/2")
        );
        assert_eq!(redirect_url(&json!({"url": ""})), None);
    }

    #[test]
    fn numeric_reference_and_transaction_are_stringified() {
        let response = json!({"referencia": 217404, "transactionId": 99});
        assert_eq!(reference(&response).as_deref(), Some("217404"));
        assert_eq!(transaction_id(&response).as_deref(), Some("99"));
    }

    #[test]
    fn mbway_acceptance() {
        assert!(mbway_accepted(&json!({"estado": "Pendente"})));
        assert!(mbway_accepted(&json!({"transactionStatus": "Success"})));
        assert!(!mbway_accepted(&json!({"transactionStatus": "Rejected"})));
    }
}
