//! File-backed storage sealed with ChaCha20-Poly1305.

use crate::{SecureStorage, StoreError, StoreResult};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Key size for ChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Generate a random storage key.
pub fn generate_file_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// [`SecureStorage`] backend that seals a JSON key-value map into a single
/// file. Layout on disk is `nonce (12 bytes) || ciphertext`, re-encrypted
/// with a fresh nonce on every write.
///
/// A file that cannot be read back under the supplied key is treated as
/// absent: the store starts empty rather than surfacing stale state.
pub struct EncryptedFileStorage {
    path: PathBuf,
    key: [u8; KEY_SIZE],
    entries: Mutex<HashMap<String, String>>,
}

impl EncryptedFileStorage {
    /// Open the store at `path`, creating it on first write.
    pub fn new(path: impl AsRef<Path>, key: [u8; KEY_SIZE]) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load(&path, &key)?;
        Ok(Self {
            path,
            key,
            entries: Mutex::new(entries),
        })
    }

    fn load(path: &Path, key: &[u8; KEY_SIZE]) -> StoreResult<HashMap<String, String>> {
        let sealed = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        if sealed.len() < NONCE_SIZE {
            warn!(path = %path.display(), "Sealed storage file is truncated, starting empty");
            return Ok(HashMap::new());
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        let cipher = ChaCha20Poly1305::new_from_slice(key)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let plaintext = match cipher.decrypt(Nonce::from_slice(nonce), ciphertext) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                warn!(path = %path.display(), "Sealed storage file failed authentication, starting empty");
                return Ok(HashMap::new());
            }
        };

        match serde_json::from_slice(&plaintext) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                warn!(path = %path.display(), %error, "Sealed storage contents are malformed, starting empty");
                Ok(HashMap::new())
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        let plaintext = serde_json::to_vec(entries)?;

        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        std::fs::write(&self.path, sealed)?;
        Ok(())
    }
}

impl SecureStorage for EncryptedFileStorage {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("storage lock poisoned".to_string()))?;
        let existed = entries.remove(key).is_some();
        self.persist(&entries)?;
        Ok(existed)
    }
}
