//! AES-256-CBC decryption of encrypted v2 notifications.
//!
//! Encrypted notifications carry `{"data": "<base64 ciphertext>"}` with the IV
//! in `X-Initialization-Vector`. EuPago has never documented how the AES key
//! is derived from the webhook secret, and accounts differ, so decryption runs
//! through an ordered list of (key derivation, padding) candidates and keeps
//! the first one that yields a JSON document.

use std::fmt;

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use thiserror::Error;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// How the AES key is derived from the webhook secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDerivation {
    /// SHA-256 digest of the secret.
    Sha256,
    /// Secret bytes, zero-padded or truncated to 32.
    Utf8,
    /// Secret is 64 hex characters.
    Hex,
    /// Secret is base64 of exactly 32 bytes.
    Base64,
}

impl KeyDerivation {
    /// Derives the key, or `None` if the secret does not fit this scheme.
    pub fn derive(&self, secret: &str) -> Option<[u8; KEY_LEN]> {
        let bytes = match self {
            KeyDerivation::Sha256 => Sha256::digest(secret.as_bytes()).to_vec(),
            KeyDerivation::Utf8 => {
                let mut raw = secret.as_bytes().to_vec();
                raw.resize(KEY_LEN, 0);
                raw
            }
            KeyDerivation::Hex => {
                if secret.len() != KEY_LEN * 2 {
                    return None;
                }
                hex::decode(secret).ok()?
            }
            KeyDerivation::Base64 => STANDARD.decode(secret).ok()?,
        };
        bytes.try_into().ok()
    }
}

/// Unpadding applied after decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    Pkcs7,
    /// No unpadding; trailing NULs are stripped from JSON-looking output.
    Raw,
}

/// One decryption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub key: KeyDerivation,
    pub padding: Padding,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.key, self.padding)
    }
}

/// Attempt order.
pub const CANDIDATES: [Candidate; 8] = [
    Candidate { key: KeyDerivation::Sha256, padding: Padding::Pkcs7 },
    Candidate { key: KeyDerivation::Sha256, padding: Padding::Raw },
    Candidate { key: KeyDerivation::Utf8, padding: Padding::Pkcs7 },
    Candidate { key: KeyDerivation::Utf8, padding: Padding::Raw },
    Candidate { key: KeyDerivation::Hex, padding: Padding::Pkcs7 },
    Candidate { key: KeyDerivation::Hex, padding: Padding::Raw },
    Candidate { key: KeyDerivation::Base64, padding: Padding::Pkcs7 },
    Candidate { key: KeyDerivation::Base64, padding: Padding::Raw },
];

/// Why an encrypted notification could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionFailure {
    #[error("missing initialization vector")]
    MissingIv,

    #[error("initialization vector must be 16 bytes of base64")]
    InvalidIv,

    #[error("ciphertext is not base64")]
    InvalidCiphertext,

    #[error("secret does not support key derivation {0:?}")]
    UnsupportedKey(KeyDerivation),

    #[error("no key derivation produced a JSON payload")]
    Exhausted,
}

/// Decrypts `data` and returns the JSON text.
pub fn decrypt(data: &str, iv: Option<&str>, secret: &str) -> Result<String, DecryptionFailure> {
    decrypt_with_candidate(data, iv, secret).map(|(plaintext, _)| plaintext)
}

/// Decrypts `data` and also reports which candidate worked.
pub fn decrypt_with_candidate(
    data: &str,
    iv: Option<&str>,
    secret: &str,
) -> Result<(String, Candidate), DecryptionFailure> {
    let iv = decode_iv(iv)?;
    let ciphertext = STANDARD
        .decode(data.trim())
        .map_err(|_| DecryptionFailure::InvalidCiphertext)?;

    for candidate in CANDIDATES {
        let Some(key) = candidate.key.derive(secret) else {
            continue;
        };
        if let Some(plaintext) = try_candidate(&ciphertext, &key, &iv, candidate.padding) {
            tracing::debug!(candidate = %candidate, "Decrypted webhook payload");
            return Ok((plaintext, candidate));
        }
    }

    Err(DecryptionFailure::Exhausted)
}

/// Encrypts `plaintext` the way the gateway would for `candidate`.
///
/// Returns base64 ciphertext. Used by diagnostics and fixtures.
pub fn encrypt(
    plaintext: &str,
    secret: &str,
    candidate: Candidate,
    iv: &[u8; IV_LEN],
) -> Result<String, DecryptionFailure> {
    let key = candidate
        .key
        .derive(secret)
        .ok_or(DecryptionFailure::UnsupportedKey(candidate.key))?;
    let cipher = Aes256CbcEnc::new_from_slices(&key, iv).map_err(|_| DecryptionFailure::InvalidIv)?;

    let ciphertext = match candidate.padding {
        Padding::Pkcs7 => cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes()),
        Padding::Raw => {
            let mut block = plaintext.as_bytes().to_vec();
            let padded_len = block.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
            block.resize(padded_len, 0);
            cipher.encrypt_padded_vec_mut::<NoPadding>(&block)
        }
    };

    Ok(STANDARD.encode(ciphertext))
}

fn decode_iv(iv: Option<&str>) -> Result<[u8; IV_LEN], DecryptionFailure> {
    let raw = iv
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(DecryptionFailure::MissingIv)?;
    let bytes = STANDARD
        .decode(raw)
        .map_err(|_| DecryptionFailure::InvalidIv)?;
    bytes.try_into().map_err(|_| DecryptionFailure::InvalidIv)
}

fn try_candidate(ciphertext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], padding: Padding) -> Option<String> {
    let cipher = Aes256CbcDec::new_from_slices(key, iv).ok()?;

    let bytes = match padding {
        Padding::Pkcs7 => cipher.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).ok()?,
        Padding::Raw => {
            let mut bytes = cipher.decrypt_padded_vec_mut::<NoPadding>(ciphertext).ok()?;
            if matches!(bytes.first(), Some(b'{') | Some(b'[')) {
                while bytes.last() == Some(&0) {
                    bytes.pop();
                }
            }
            bytes
        }
    };

    let text = String::from_utf8(bytes).ok()?;
    looks_like_json(&text).then_some(text)
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}
