//! Storage trait definitions.

use crate::StoreResult;

/// Trait for secure storage backends.
///
/// Implementations must keep values encrypted at rest. The vault never
/// inspects how; the mobile shells back this with the platform keystore
/// and headless builds use [`crate::EncryptedFileStorage`].
pub trait SecureStorage: Send + Sync {
    /// Store a value securely
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete a value, reporting whether it existed
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
