//! Per-attempt X25519 keypairs.

use crate::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use tracing::debug;
use uuid::Uuid;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key size for X25519 public/private keys (32 bytes).
pub const KEY_SIZE: usize = 32;

/// Secret scalar bytes, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SecretBytes([u8; KEY_SIZE]);

/// An in-memory X25519 keypair bound to one sign-in attempt.
///
/// Never persisted. The secret half lives only as long as the attempt;
/// [`AttemptKeyPair::destroy`] retires it at the terminal transitions and
/// drop wipes it regardless.
pub struct AttemptKeyPair {
    /// The attempt this keypair belongs to
    pub attempt_id: Uuid,
    /// When the keypair was generated
    pub created_at: DateTime<Utc>,
    public_key: [u8; KEY_SIZE],
    secret: SecretBytes,
}

impl AttemptKeyPair {
    /// The public half, embedded into the authorize URL.
    pub fn public_key(&self) -> &[u8; KEY_SIZE] {
        &self.public_key
    }

    /// The public half as standard base64 for URL embedding.
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.public_key)
    }

    pub(crate) fn secret_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.secret.0
    }

    /// Retire the keypair, wiping the secret. Called at every terminal
    /// transition of a handshake so key material cannot outlive the
    /// attempt it was made for.
    pub fn destroy(self) {
        debug!(attempt_id = %self.attempt_id, "Attempt keypair destroyed");
    }
}

// The secret stays out of Debug output.
impl fmt::Debug for AttemptKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptKeyPair")
            .field("attempt_id", &self.attempt_id)
            .field("created_at", &self.created_at)
            .field("public_key", &self.public_key_base64())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh keypair for `attempt_id`.
///
/// Key material comes from the OS random source; a refusal surfaces as
/// [`CryptoError::KeyGeneration`] rather than aborting.
pub fn generate_attempt_keypair(attempt_id: Uuid) -> CryptoResult<AttemptKeyPair> {
    let mut bytes = [0u8; KEY_SIZE];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    let public_key = PublicKey::from(&StaticSecret::from(bytes)).to_bytes();
    let secret = SecretBytes(bytes);
    bytes.zeroize();

    debug!(attempt_id = %attempt_id, "Attempt keypair generated");
    Ok(AttemptKeyPair {
        attempt_id,
        created_at: Utc::now(),
        public_key,
        secret,
    })
}
