//! EuPago webhook signature verification.
//!
//! EuPago signs each notification with HMAC-SHA256 keyed by the organizer's
//! webhook secret and sends the digest in `X-Signature`. Encrypted (v2)
//! bodies are signed over the `data` ciphertext string, everything else over
//! the raw body. The digest arrives base64 encoded, though some accounts send
//! hex, so both are accepted.

use std::borrow::Cow;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Byte length of an HMAC-SHA256 digest.
const DIGEST_LEN: usize = 32;

/// Encoding the signature header was sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    Base64,
    Hex,
}

impl fmt::Display for SignatureEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureEncoding::Base64 => write!(f, "base64"),
            SignatureEncoding::Hex => write!(f, "hex"),
        }
    }
}

/// Result of checking a signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No secret configured; checking is skipped.
    Bypassed,
    /// Digest matched.
    Valid(SignatureEncoding),
    /// Header absent or blank.
    Missing,
    /// Header is neither a 32-byte base64 nor a hex digest.
    Malformed,
    /// Well-formed digest that does not match.
    Mismatch,
}

impl Verdict {
    /// True if the request may proceed.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Bypassed | Verdict::Valid(_))
    }
}

/// Verifier for EuPago webhook signatures.
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    /// Creates a verifier keyed by the organizer's webhook secret.
    ///
    /// An empty secret means the organizer has not configured one and every
    /// request is accepted.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Checks `header` against the HMAC of `body`.
    ///
    /// Never panics on malformed input; a header that cannot be decoded is
    /// reported as [`Verdict::Malformed`].
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> Verdict {
        if !self.is_configured() {
            return Verdict::Bypassed;
        }

        let header = match header.map(str::trim) {
            Some(h) if !h.is_empty() => h,
            _ => return Verdict::Missing,
        };

        let Some((provided, encoding)) = decode_signature(header) else {
            return Verdict::Malformed;
        };

        let Some(expected) = self.digest(&signed_message(body)) else {
            return Verdict::Mismatch;
        };

        if constant_time_compare(&expected, &provided) {
            tracing::debug!(encoding = %encoding, "Webhook signature matched");
            Verdict::Valid(encoding)
        } else {
            Verdict::Mismatch
        }
    }

    /// Base64 signature for `body`, as EuPago would send it.
    pub fn sign_base64(&self, body: &[u8]) -> Option<String> {
        self.digest(&signed_message(body))
            .map(|digest| STANDARD.encode(digest))
    }

    /// Hex signature for `body`.
    pub fn sign_hex(&self, body: &[u8]) -> Option<String> {
        self.digest(&signed_message(body)).map(hex::encode)
    }

    fn digest(&self, message: &[u8]) -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(message);
        Some(mac.finalize().into_bytes().to_vec())
    }
}

/// Bytes covered by the signature.
///
/// A JSON object body with a string `data` field is signed over that string;
/// any other body is signed as-is.
pub fn signed_message(body: &[u8]) -> Cow<'_, [u8]> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => match fields.get("data") {
            Some(Value::String(data)) => Cow::Owned(data.clone().into_bytes()),
            _ => Cow::Borrowed(body),
        },
        _ => Cow::Borrowed(body),
    }
}

/// Base64 first (only when it yields a full digest), then hex.
fn decode_signature(header: &str) -> Option<(Vec<u8>, SignatureEncoding)> {
    if let Ok(bytes) = STANDARD.decode(header) {
        if bytes.len() == DIGEST_LEN {
            return Some((bytes, SignatureEncoding::Base64));
        }
    }

    hex::decode(header)
        .ok()
        .map(|bytes| (bytes, SignatureEncoding::Hex))
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
