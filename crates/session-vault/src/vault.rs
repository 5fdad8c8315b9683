//! Single-writer session store with sign-out fencing.

use crate::{SecureStorage, SessionCredentials, StoreResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The one storage key the session record lives under.
pub const CREDENTIALS_KEY: &str = "com.agora.session.credentials.v1";

/// Result of a [`SessionVault::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The record was written and is now the current session.
    Stored,
    /// A sign-out overtook this write; nothing was stored.
    SupersededBySignOut,
}

/// Owns every mutation of the persisted session record.
///
/// Writes are serialized behind one async lock. Each mutation takes a
/// ticket at call entry; `clear` raises a barrier to its own ticket, and
/// any `put` whose ticket is at or below the barrier commits nothing.
/// That keeps a sign-out from being overwritten by a credential write
/// that was already in flight when the user signed out.
pub struct SessionVault {
    storage: Box<dyn SecureStorage>,
    writer: Mutex<()>,
    op_seq: AtomicU64,
    clear_barrier: AtomicU64,
}

impl SessionVault {
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self {
            storage,
            writer: Mutex::new(()),
            op_seq: AtomicU64::new(0),
            clear_barrier: AtomicU64::new(0),
        }
    }

    fn next_ticket(&self) -> u64 {
        self.op_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store `credentials` as the current session, replacing any previous
    /// record. Reports [`PutOutcome::SupersededBySignOut`] when a sign-out
    /// that began after this call was issued has already won.
    pub async fn put(&self, credentials: &SessionCredentials) -> StoreResult<PutOutcome> {
        let ticket = self.next_ticket();
        self.put_ticketed(ticket, credentials).await
    }

    async fn put_ticketed(
        &self,
        ticket: u64,
        credentials: &SessionCredentials,
    ) -> StoreResult<PutOutcome> {
        let _guard = self.writer.lock().await;

        if self.clear_barrier.load(Ordering::SeqCst) >= ticket {
            warn!(
                user_id = %credentials.user_id,
                "Credential write superseded by sign-out, dropping"
            );
            return Ok(PutOutcome::SupersededBySignOut);
        }

        let record = serde_json::to_string(credentials)?;
        self.storage.set(CREDENTIALS_KEY, &record)?;
        debug!(user_id = %credentials.user_id, "Session credentials stored");
        Ok(PutOutcome::Stored)
    }

    /// Remove the current session record. Idempotent.
    pub async fn clear(&self) -> StoreResult<()> {
        let ticket = self.next_ticket();
        let _guard = self.writer.lock().await;

        self.clear_barrier.fetch_max(ticket, Ordering::SeqCst);
        self.storage.delete(CREDENTIALS_KEY)?;
        info!("Session credentials cleared");
        Ok(())
    }

    /// The stored session record, if one can be read back intact.
    ///
    /// Fails closed: backend errors and corrupt records are logged and
    /// reported as no session.
    pub fn get(&self) -> Option<SessionCredentials> {
        match self.storage.get(CREDENTIALS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(credentials) => Some(credentials),
                Err(error) => {
                    warn!(%error, "Stored session record is corrupt, treating as signed out");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(%error, "Session read failed, treating as signed out");
                None
            }
        }
    }

    /// The stored session, only if it is still usable.
    pub fn get_active(&self) -> Option<SessionCredentials> {
        self.get().filter(|credentials| {
            if credentials.is_expired() {
                debug!(
                    user_id = %credentials.user_id,
                    expires_at = %credentials.expires_at,
                    "Stored session is expired"
                );
                false
            } else {
                true
            }
        })
    }
}
