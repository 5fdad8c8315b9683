//! Handshake cryptography for the Agora authorization flow.
//!
//! Each sign-in attempt gets a fresh X25519 keypair whose public half rides
//! to the forum inside the authorize URL. The forum encrypts the issued
//! credentials to that key and hands them back through a deep link; this
//! crate owns both the keypair lifecycle and the payload decryption.
//!
//! Decryption fails closed: any error produces no credentials at all.

mod keys;
mod payload;

pub use keys::{generate_attempt_keypair, AttemptKeyPair, KEY_SIZE};
pub use payload::{decrypt_credentials, seal_credentials, EncryptedPayload, NONCE_SIZE};

use thiserror::Error;

/// Errors from key generation and payload sealing.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The OS random source refused to produce key material
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Sealing a payload failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The plaintext record could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for key generation and sealing.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors from decrypting and validating an authorization payload.
///
/// The decryption variant carries no detail: nothing derived from key
/// material or ciphertext internals belongs in logs or UI text.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The payload or nonce parameter could not be decoded
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Authenticated decryption failed
    #[error("Payload decryption failed")]
    Decryption,

    /// The plaintext decrypted but is not an acceptable credential record
    #[error("Credential validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Why a decrypted credential record was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The plaintext is not a credential record at all
    #[error("Credential record is not valid JSON")]
    NotJson,

    /// A required field is missing or blank
    #[error("Required credential field is blank: {0}")]
    BlankField(&'static str),

    /// The credentials were already expired on arrival
    #[error("Credentials expired before they arrived")]
    Expired,
}
