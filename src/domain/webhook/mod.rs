//! EuPago webhook protocol: signatures, encryption and wire formats.

mod decryption;
mod errors;
mod notification;
mod signature;

pub use decryption::{
    decrypt, decrypt_with_candidate, encrypt, Candidate, DecryptionFailure, KeyDerivation,
    Padding, CANDIDATES,
};
pub use errors::WebhookError;
pub use notification::{
    detect_format, encrypted_data, LegacyNotice, LegacyParams, Notification, TransactionNotice,
    WebhookEnvelope, IV_HEADER, LEGACY_REQUIRED_PARAMS, SIGNATURE_HEADER,
};
pub use signature::{signed_message, SignatureEncoding, SignatureVerifier, Verdict};
