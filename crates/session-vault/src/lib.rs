//! Encrypted session storage for the Agora client.
//!
//! This crate owns the persisted session record and the single place it is
//! allowed to live. Backends implement [`SecureStorage`]; the shipped
//! [`EncryptedFileStorage`] seals a JSON map with ChaCha20-Poly1305 under a
//! caller-supplied key, while mobile shells plug their platform keystore in
//! behind the same trait.
//!
//! All reads fail closed: a missing, unreadable, or corrupt record is
//! reported as "no session", never as a stale one.

mod credentials;
mod file;
mod traits;
mod vault;

pub use credentials::{SessionCredentials, EXPIRY_LEEWAY_SECS};
pub use file::{generate_file_key, EncryptedFileStorage, KEY_SIZE};
pub use traits::SecureStorage;
pub use vault::{PutOutcome, SessionVault, CREDENTIALS_KEY};

use thiserror::Error;

/// Error type for session storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Record serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
