//! Authorization payload sealing and opening.
//!
//! Hybrid encryption using X25519 ECDH + HKDF-SHA256 + ChaCha20-Poly1305.
//! The forum seals the issued credentials to the attempt's public key; the
//! client opens them with the attempt's secret.
//!
//! HKDF parameters (must match the forum server implementation):
//! - Hash: SHA-256
//! - Salt: attempt UUID string bytes
//! - Info: b"agora-authorize-v1"
//! - Output: 32 bytes

use crate::{AttemptKeyPair, CryptoError, CryptoResult, PayloadError, ValidationError, KEY_SIZE};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use session_vault::SessionCredentials;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroize;

/// HKDF info string binding derived keys to this protocol version.
const HKDF_INFO: &[u8] = b"agora-authorize-v1";

/// Nonce size for ChaCha20-Poly1305 (12 bytes / 96 bits).
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size.
const TAG_SIZE: usize = 16;

/// The encrypted credential payload carried by an authorization callback.
///
/// On the wire the `payload` query parameter is
/// `base64(ephemeral_public (32) || ciphertext || tag (16))` and `nonce`
/// is the base64 of the 12-byte AEAD nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Attempt the payload claims to answer
    pub attempt_id: Uuid,
    /// Sender's ephemeral X25519 public key
    pub ephemeral_public: [u8; KEY_SIZE],
    /// AEAD nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with authentication tag appended
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Assemble a payload from the raw callback query parameters.
    pub fn from_parts(
        attempt_id: Uuid,
        payload_b64: &str,
        nonce_b64: &str,
    ) -> Result<Self, PayloadError> {
        let blob = BASE64
            .decode(payload_b64)
            .map_err(|e| PayloadError::Malformed(format!("payload is not base64: {e}")))?;

        if blob.len() < KEY_SIZE + TAG_SIZE {
            return Err(PayloadError::Malformed(format!(
                "payload too short: {} bytes, need at least {}",
                blob.len(),
                KEY_SIZE + TAG_SIZE
            )));
        }

        let mut ephemeral_public = [0u8; KEY_SIZE];
        ephemeral_public.copy_from_slice(&blob[..KEY_SIZE]);
        let ciphertext = blob[KEY_SIZE..].to_vec();

        let nonce_bytes = BASE64
            .decode(nonce_b64)
            .map_err(|e| PayloadError::Malformed(format!("nonce is not base64: {e}")))?;
        let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
            PayloadError::Malformed(format!(
                "nonce is {} bytes, expected {NONCE_SIZE}",
                nonce_bytes.len()
            ))
        })?;

        Ok(Self {
            attempt_id,
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// The `(payload, nonce)` query parameter values for this payload.
    pub fn to_parts(&self) -> (String, String) {
        let mut blob = Vec::with_capacity(KEY_SIZE + self.ciphertext.len());
        blob.extend_from_slice(&self.ephemeral_public);
        blob.extend_from_slice(&self.ciphertext);
        (BASE64.encode(blob), BASE64.encode(self.nonce))
    }
}

fn derive_symmetric_key(
    shared_secret: &x25519_dalek::SharedSecret,
    attempt_id: Uuid,
) -> Result<[u8; KEY_SIZE], PayloadError> {
    let attempt = attempt_id.to_string();
    let hkdf = Hkdf::<Sha256>::new(Some(attempt.as_bytes()), shared_secret.as_bytes());
    let mut symmetric_key = [0u8; KEY_SIZE];
    hkdf.expand(HKDF_INFO, &mut symmetric_key)
        .map_err(|_| PayloadError::Decryption)?;
    Ok(symmetric_key)
}

/// Open `payload` with the attempt's secret and validate the plaintext as
/// a credential record.
///
/// Fails closed: every failure mode yields an error and no credentials.
/// Callers must have already checked that the payload answers the pending
/// attempt; the attempt id also feeds key derivation, so a payload sealed
/// for a different attempt cannot decrypt even with a matching keypair.
pub fn decrypt_credentials(
    payload: &EncryptedPayload,
    keypair: &AttemptKeyPair,
) -> Result<SessionCredentials, PayloadError> {
    let secret = StaticSecret::from(*keypair.secret_bytes());
    let ephemeral_public = PublicKey::from(payload.ephemeral_public);
    let shared_secret = secret.diffie_hellman(&ephemeral_public);

    let mut symmetric_key = derive_symmetric_key(&shared_secret, keypair.attempt_id)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&symmetric_key));
    let opened = cipher.decrypt(
        Nonce::from_slice(&payload.nonce),
        payload.ciphertext.as_slice(),
    );
    symmetric_key.zeroize();

    let mut plaintext = opened.map_err(|_| PayloadError::Decryption)?;

    let parsed: Result<SessionCredentials, _> = serde_json::from_slice(&plaintext);
    plaintext.zeroize();

    let credentials = parsed.map_err(|_| ValidationError::NotJson)?;
    validate(&credentials)?;

    debug!(
        attempt_id = %keypair.attempt_id,
        user_id = %credentials.user_id,
        "Authorization payload decrypted"
    );
    Ok(credentials)
}

fn validate(credentials: &SessionCredentials) -> Result<(), ValidationError> {
    if credentials.user_id.trim().is_empty() {
        return Err(ValidationError::BlankField("userId"));
    }
    if credentials.access_token.trim().is_empty() {
        return Err(ValidationError::BlankField("accessToken"));
    }
    if let Some(refresh) = &credentials.refresh_token {
        if refresh.trim().is_empty() {
            return Err(ValidationError::BlankField("refreshToken"));
        }
    }
    if credentials.expires_at <= chrono::Utc::now() {
        return Err(ValidationError::Expired);
    }
    Ok(())
}

/// Seal `credentials` to `recipient_public` for `attempt_id`.
///
/// This is the forum's half of the exchange, kept here so tests and
/// development tooling can produce callbacks the client accepts.
pub fn seal_credentials(
    credentials: &SessionCredentials,
    recipient_public: &[u8; KEY_SIZE],
    attempt_id: Uuid,
) -> CryptoResult<EncryptedPayload> {
    let mut plaintext = serde_json::to_vec(credentials)?;
    let sealed = seal_bytes(&plaintext, recipient_public, attempt_id);
    plaintext.zeroize();
    sealed
}

fn seal_bytes(
    plaintext: &[u8],
    recipient_public: &[u8; KEY_SIZE],
    attempt_id: Uuid,
) -> CryptoResult<EncryptedPayload> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(rand::thread_rng());
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    let recipient = PublicKey::from(*recipient_public);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient);

    let attempt = attempt_id.to_string();
    let hkdf = Hkdf::<Sha256>::new(Some(attempt.as_bytes()), shared_secret.as_bytes());
    let mut symmetric_key = [0u8; KEY_SIZE];
    hkdf.expand(HKDF_INFO, &mut symmetric_key)
        .map_err(|e| CryptoError::Encryption(format!("HKDF expand failed: {e}")))?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&symmetric_key));
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("Encryption failed: {e}")));
    symmetric_key.zeroize();

    Ok(EncryptedPayload {
        attempt_id,
        ephemeral_public: ephemeral_public.to_bytes(),
        nonce,
        ciphertext: ciphertext?,
    })
}
