//! Inbound notification envelope and wire-format parsing.
//!
//! EuPago has two webhook generations:
//!
//! - **v2**: POST with a JSON body, optionally encrypted as `{"data": "..."}`
//! - **v1**: GET query string or urlencoded POST form, sent only for paid
//!   transactions
//!
//! This module only parses. Decryption, verification and reconciliation are
//! orchestrated by `HandleWebhookHandler`.

use http::Method;
use serde_json::{Map, Value};

use super::WebhookError;

/// Header carrying the HMAC digest.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Header carrying the base64 AES IV for encrypted bodies.
pub const IV_HEADER: &str = "x-initialization-vector";

/// Parameters a v1 notification must carry, in reporting order.
pub const LEGACY_REQUIRED_PARAMS: [&str; 3] = ["referencia", "identificador", "valor"];

/// Raw inbound webhook request.
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    pub method: Method,
    pub content_type: Option<String>,
    pub query: Option<String>,
    pub body: Vec<u8>,
    pub signature: Option<String>,
    pub iv: Option<String>,
}

impl WebhookEnvelope {
    /// A v2 JSON POST.
    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::POST,
            content_type: Some("application/json".to_string()),
            query: None,
            body: body.into(),
            signature: None,
            iv: None,
        }
    }

    /// A v1 GET with the given query string.
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            content_type: None,
            query: Some(query.into()),
            body: Vec::new(),
            signature: None,
            iv: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_iv(mut self, iv: impl Into<String>) -> Self {
        self.iv = Some(iv.into());
        self
    }
}

/// Detected wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// v2 JSON body.
    Structured(Value),
    /// v1 parameters.
    Legacy(LegacyParams),
}

impl Notification {
    pub fn version(&self) -> &'static str {
        match self {
            Notification::Structured(_) => "v2",
            Notification::Legacy(_) => "v1",
        }
    }
}

/// Detects the wire format of `envelope`.
///
/// A POST whose trimmed body starts with `{` and parses as JSON is v2;
/// everything else is v1.
///
/// # Errors
///
/// `InvalidEncoding` when a POST body is not UTF-8.
pub fn detect_format(envelope: &WebhookEnvelope) -> Result<Notification, WebhookError> {
    let is_post = envelope.method == Method::POST;

    let body = if is_post {
        std::str::from_utf8(&envelope.body)
            .map_err(|_| WebhookError::InvalidEncoding)?
            .trim()
    } else {
        ""
    };

    if is_post && body.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            return Ok(Notification::Structured(value));
        }
    }

    let mut params = LegacyParams::parse(envelope.query.as_deref().unwrap_or(""));
    if params.is_empty() && is_post {
        params = LegacyParams::parse(body);
    }
    Ok(Notification::Legacy(params))
}

/// Ciphertext of an encrypted v2 body, if it is one.
pub fn encrypted_data(body: &Value) -> Option<&str> {
    body.get("data").and_then(Value::as_str)
}

/// Transaction object of a v2 notification with its lookup keys.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionNotice {
    pub transaction: Value,
    pub identifier: Option<String>,
    pub reference: Option<String>,
}

impl TransactionNotice {
    /// Extracts the transaction from a (decrypted) v2 body.
    ///
    /// Looks at `transactions` (first element of an array, or an object),
    /// then `transaction`, then the body itself.
    ///
    /// # Errors
    ///
    /// - `MissingTransactionData` - no non-empty transaction object
    /// - `MissingIdentifiers` - neither identifier nor reference present
    pub fn from_body(body: &Value) -> Result<Self, WebhookError> {
        let candidate = if let Some(transactions) = body.get("transactions") {
            match transactions {
                Value::Array(items) => items.first(),
                Value::Object(_) => Some(transactions),
                _ => None,
            }
        } else if let Some(transaction) = body.get("transaction") {
            Some(transaction)
        } else {
            Some(body)
        };

        let transaction = match candidate {
            Some(Value::Object(fields)) if !fields.is_empty() => Value::Object(fields.clone()),
            _ => return Err(WebhookError::MissingTransactionData),
        };

        let identifier = text_field(&transaction, &["identifier", "identificador"]);
        let reference = text_field(&transaction, &["reference", "referencia"]);

        if identifier.is_none() && reference.is_none() {
            return Err(WebhookError::MissingIdentifiers);
        }

        Ok(Self {
            transaction,
            identifier,
            reference,
        })
    }
}

/// First non-empty string or number among `keys`, as text.
fn text_field(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// v1 notification parameters. Repeated keys keep the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyParams {
    fields: Map<String, Value>,
}

impl LegacyParams {
    /// Parses a urlencoded string. Undecodable input yields no parameters.
    pub fn parse(raw: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();
        let fields = pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Required parameters that are absent, in reporting order.
    pub fn missing(&self) -> Vec<&'static str> {
        LEGACY_REQUIRED_PARAMS
            .into_iter()
            .filter(|param| !self.fields.contains_key(*param))
            .collect()
    }

    /// Validates presence of the required parameters.
    pub fn into_notice(self) -> Result<LegacyNotice, WebhookError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(WebhookError::MissingParameters(missing));
        }

        Ok(LegacyNotice {
            identifier: self.get("identificador").unwrap_or_default().to_string(),
            reference: self.get("referencia").unwrap_or_default().to_string(),
            amount: self.get("valor").unwrap_or_default().to_string(),
            payload: Value::Object(self.fields),
        })
    }
}

/// A validated v1 notification. Always means the transaction was paid.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyNotice {
    pub identifier: String,
    pub reference: String,
    pub amount: String,
    pub payload: Value,
}
